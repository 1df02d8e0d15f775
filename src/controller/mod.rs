// PaneController: the single entry point for pane management.
//
// Turns actions into tree mutations, emits renderer events, defers focus of
// new panes until their widgets are ready, and reacts to terminal exits.

pub mod action;
pub mod event;
mod focus;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

pub use action::{ActionParams, ActionRequest, PaneAction};
pub use event::PaneEvent;

use crate::config::PaneConfig;
use crate::error::PaneError;
use crate::pane::{
    Leaf, Orientation, PaneId, PaneLayoutState, PaneTree, WidgetState, MAX_SPLIT_DEPTH,
};
use crate::widget::{Readiness, WidgetFactory};
use focus::FocusTracker;

/// Called with the leaf id when a terminal hosted in that leaf exits.
pub type TerminalCloseCallback = Box<dyn FnMut(&PaneId)>;

/// Owns the pane tree and mediates every change to it.
///
/// Lives on the event-loop thread. Call [`PaneController::poll`] once per
/// loop turn to deliver deferred focus events and queued terminal exits.
pub struct PaneController<W: WidgetFactory> {
    tree: PaneTree,
    widgets: W,
    config: PaneConfig,
    focus: FocusTracker,
    events_tx: Sender<PaneEvent>,
    events_rx: Receiver<PaneEvent>,
    exit_tx: Sender<PaneId>,
    exit_rx: Receiver<PaneId>,
    terminal_close_callback: Option<TerminalCloseCallback>,
}

impl<W: WidgetFactory> PaneController<W> {
    /// Create a controller over a fresh single-leaf tree, building its widget.
    pub fn new(config: PaneConfig, widgets: W) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let (exit_tx, exit_rx) = crossbeam_channel::unbounded();
        let mut controller = Self {
            tree: PaneTree::new(),
            widgets,
            config,
            focus: FocusTracker::default(),
            events_tx,
            events_rx,
            exit_tx,
            exit_rx,
            terminal_close_callback: None,
        };
        controller.create_widgets();
        controller
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Read-only view of the tree, for renderers walking the layout.
    pub fn tree(&self) -> &PaneTree {
        &self.tree
    }

    /// The focused leaf.
    pub fn active_pane(&self) -> Option<&PaneId> {
        self.tree.active_leaf_id()
    }

    /// Number of leaves in the layout.
    pub fn pane_count(&self) -> usize {
        self.tree.leaf_count()
    }

    /// Leaf content (widget type and persisted state) for `id`.
    pub fn leaf(&self, id: &PaneId) -> Option<&Leaf> {
        self.tree.leaf(id)
    }

    /// Configuration the controller was built with.
    pub fn config(&self) -> &PaneConfig {
        &self.config
    }

    /// The widget factory.
    pub fn widgets(&self) -> &W {
        &self.widgets
    }

    /// Mutable access to the widget factory, e.g. to report readiness.
    pub fn widgets_mut(&mut self) -> &mut W {
        &mut self.widgets
    }

    /// Whether `id` is still waiting for its focus-ready announcement.
    pub fn is_focus_pending(&self, id: &PaneId) -> bool {
        self.focus.is_pending(id)
    }

    /// Earliest instant at which `poll` has a delayed focus event to deliver.
    pub fn next_focus_deadline(&self) -> Option<Instant> {
        self.focus.next_deadline()
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Receiver for emitted events. Clones share one queue.
    pub fn events(&self) -> Receiver<PaneEvent> {
        self.events_rx.clone()
    }

    /// Take every event emitted so far.
    pub fn drain_events(&self) -> Vec<PaneEvent> {
        self.events_rx.try_iter().collect()
    }

    fn emit(&self, event: PaneEvent) {
        log::trace!("Pane event: {event:?}");
        // The controller holds a receiver, so the channel never disconnects.
        let _ = self.events_tx.send(event);
    }

    // ── Action dispatch ──────────────────────────────────────────────

    /// Apply `action` to `leaf_id`. Failures, including panics raised by the
    /// widget factory, are logged and reported as `false`.
    pub fn handle_action(&mut self, leaf_id: &PaneId, action: PaneAction) -> bool {
        let name = action.name();
        match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(leaf_id, action))) {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                log::warn!("Pane action '{name}' on {leaf_id} failed: {e}");
                false
            }
            Err(payload) => {
                log::error!(
                    "Pane action '{name}' on {leaf_id} panicked: {}",
                    panic_message(payload.as_ref())
                );
                false
            }
        }
    }

    /// Parse and apply a wire request. Requests without a `leaf_id` address the active leaf.
    pub fn handle_request(&mut self, request: ActionRequest) -> bool {
        let (leaf_id, action) = match request.into_action() {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Rejected pane request: {e}");
                return false;
            }
        };
        let Some(leaf_id) = leaf_id.or_else(|| self.tree.active_leaf_id().cloned()) else {
            log::warn!("Pane request '{}' has no target leaf", action.name());
            return false;
        };
        self.handle_action(&leaf_id, action)
    }

    fn dispatch(&mut self, leaf_id: &PaneId, action: PaneAction) -> Result<(), PaneError> {
        match action {
            PaneAction::Split {
                orientation,
                target,
                widget_type,
            } => {
                let target = target.unwrap_or_else(|| leaf_id.clone());
                let orientation = orientation.unwrap_or(self.config.split.default_orientation);
                let widget_type =
                    widget_type.unwrap_or_else(|| self.config.split.new_widget_type.clone());
                self.split_pane(&target, orientation, &widget_type)?;
                Ok(())
            }
            PaneAction::Close => self.close_pane(leaf_id),
            PaneAction::ChangeType { new_type } => self.change_type(leaf_id, &new_type),
            PaneAction::Focus => {
                if self.set_active_pane(leaf_id) {
                    Ok(())
                } else {
                    Err(PaneError::LeafNotFound(leaf_id.clone()))
                }
            }
        }
    }

    // ── Split ────────────────────────────────────────────────────────

    /// Split `leaf_id` top/bottom with the configured new-pane widget type.
    pub fn split_horizontal(&mut self, leaf_id: &PaneId) -> Option<PaneId> {
        self.split_logged(leaf_id, Orientation::Horizontal)
    }

    /// Split `leaf_id` left/right with the configured new-pane widget type.
    pub fn split_vertical(&mut self, leaf_id: &PaneId) -> Option<PaneId> {
        self.split_logged(leaf_id, Orientation::Vertical)
    }

    fn split_logged(&mut self, leaf_id: &PaneId, orientation: Orientation) -> Option<PaneId> {
        let widget_type = self.config.split.new_widget_type.clone();
        match self.split_pane(leaf_id, orientation, &widget_type) {
            Ok(new_id) => Some(new_id),
            Err(e) => {
                log::warn!("Split of {leaf_id} failed: {e}");
                None
            }
        }
    }

    /// Shared split routine: mutate, build the widget, announce, then prepare focus.
    fn split_pane(
        &mut self,
        leaf_id: &PaneId,
        orientation: Orientation,
        widget_type: &str,
    ) -> Result<PaneId, PaneError> {
        if !self.widgets.supports(widget_type) {
            return Err(PaneError::InvalidWidgetType(widget_type.to_string()));
        }
        if !self.tree.contains_leaf(leaf_id) {
            return Err(PaneError::LeafNotFound(leaf_id.clone()));
        }
        if self.tree.depth_of(leaf_id).unwrap_or(0) >= MAX_SPLIT_DEPTH {
            return Err(PaneError::SplitTooDeep(leaf_id.clone()));
        }
        let new_id = self
            .tree
            .split(leaf_id, orientation, widget_type)
            .ok_or_else(|| PaneError::LeafNotFound(leaf_id.clone()))?;
        self.widgets.create(&new_id, widget_type);

        self.emit(PaneEvent::PaneAdded { id: new_id.clone() });
        self.emit(PaneEvent::PaneSplit {
            original: leaf_id.clone(),
            new: new_id.clone(),
        });
        self.prepare_focus(&new_id);
        Ok(new_id)
    }

    /// Defer the focus announcement for a new leaf until its widget is ready.
    ///
    /// The tree already made the leaf active; no `ActivePaneChanged` is sent.
    /// Also re-run when a still-pending leaf gets a new widget.
    fn prepare_focus(&mut self, leaf_id: &PaneId) {
        match self.widgets.readiness(leaf_id) {
            Readiness::Ready => {
                let due = Instant::now() + self.config.focus.ready_delay();
                self.focus.schedule(leaf_id.clone(), due);
            }
            Readiness::Pending => {
                let ready_rx = self.widgets.subscribe_ready(leaf_id);
                self.focus.wait(leaf_id.clone(), ready_rx);
            }
            Readiness::Failed => {
                log::warn!("Widget for pane {leaf_id} failed to initialize");
            }
        }
    }

    // ── Close / change type / focus ──────────────────────────────────

    /// Close `leaf_id`, cancelling any pending focus for it and releasing its widget.
    ///
    /// The last leaf is reset to a placeholder instead, with a fresh widget.
    pub fn close_pane(&mut self, leaf_id: &PaneId) -> Result<(), PaneError> {
        if !self.tree.contains_leaf(leaf_id) {
            return Err(PaneError::LeafNotFound(leaf_id.clone()));
        }
        let last_pane = self.tree.leaf_count() == 1;
        let previous_active = self.tree.active_leaf_id().cloned();

        if !self.tree.close(leaf_id) {
            return Err(PaneError::LeafNotFound(leaf_id.clone()));
        }
        let was_pending = self.focus.cancel(leaf_id);
        self.widgets.release(leaf_id);

        if last_pane {
            let widget_type = self
                .tree
                .leaf(leaf_id)
                .map(|leaf| leaf.widget_type.clone())
                .unwrap_or_default();
            self.widgets.create(leaf_id, &widget_type);
            self.emit(PaneEvent::WidgetTypeChanged {
                id: leaf_id.clone(),
                widget_type,
            });
            if was_pending {
                self.prepare_focus(leaf_id);
            }
        } else {
            self.emit(PaneEvent::PaneRemoved { id: leaf_id.clone() });
        }

        let active = self.tree.active_leaf_id().cloned();
        if active != previous_active {
            if let Some(id) = active {
                self.emit(PaneEvent::ActivePaneChanged { id });
            }
        }
        Ok(())
    }

    /// Swap the widget type of `leaf_id`, validated against the widget factory.
    ///
    /// The old widget is released and a new one created. A leaf still waiting
    /// for its focus announcement keeps waiting, now on the new widget.
    pub fn change_type(&mut self, leaf_id: &PaneId, new_type: &str) -> Result<(), PaneError> {
        if !self.widgets.supports(new_type) {
            return Err(PaneError::InvalidWidgetType(new_type.to_string()));
        }
        if !self.tree.change_leaf_type(leaf_id, new_type) {
            return Err(PaneError::LeafNotFound(leaf_id.clone()));
        }
        let was_pending = self.focus.cancel(leaf_id);
        self.widgets.release(leaf_id);
        self.widgets.create(leaf_id, new_type);
        self.emit(PaneEvent::WidgetTypeChanged {
            id: leaf_id.clone(),
            widget_type: new_type.to_string(),
        });
        if was_pending {
            self.prepare_focus(leaf_id);
        }
        Ok(())
    }

    /// Make `leaf_id` active, announcing the change. Returns false for unknown leaves.
    pub fn set_active_pane(&mut self, leaf_id: &PaneId) -> bool {
        if self.tree.active_leaf_id() == Some(leaf_id) {
            return true;
        }
        if !self.tree.set_active(leaf_id) {
            return false;
        }
        self.emit(PaneEvent::ActivePaneChanged { id: leaf_id.clone() });
        true
    }

    /// Move focus to the next leaf in layout order.
    pub fn focus_next(&mut self) -> bool {
        let next = self
            .tree
            .active_leaf_id()
            .and_then(|active| self.tree.next_leaf(active));
        next.is_some_and(|id| self.set_active_pane(&id))
    }

    /// Move focus to the previous leaf in layout order.
    pub fn focus_prev(&mut self) -> bool {
        let prev = self
            .tree
            .active_leaf_id()
            .and_then(|active| self.tree.prev_leaf(active));
        prev.is_some_and(|id| self.set_active_pane(&id))
    }

    /// Apply a divider drag to `split_id`. The ratio is clamped.
    pub fn resize_split(&mut self, split_id: &PaneId, ratio: f32) -> bool {
        self.tree.update_ratio(split_id, ratio)
    }

    /// Store the widget's opaque state on its leaf so it is persisted.
    pub fn update_widget_state(&mut self, leaf_id: &PaneId, state: WidgetState) -> bool {
        self.tree.set_widget_state(leaf_id, state)
    }

    // ── Terminal exits ───────────────────────────────────────────────

    /// Route terminal exits to `callback` instead of closing the pane.
    pub fn set_terminal_close_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&PaneId) + 'static,
    {
        self.terminal_close_callback = Some(Box::new(callback));
    }

    pub fn clear_terminal_close_callback(&mut self) {
        self.terminal_close_callback = None;
    }

    /// Sender for terminal-exit notifications from other threads; drained by `poll`.
    pub fn terminal_exit_notifier(&self) -> Sender<PaneId> {
        self.exit_tx.clone()
    }

    /// A terminal hosted in `leaf_id` exited.
    ///
    /// Goes to the registered callback if there is one; otherwise the pane is
    /// closed (unless `terminal.auto_close_on_exit` is off).
    pub fn notify_terminal_exited(&mut self, leaf_id: &PaneId) {
        if !self.tree.contains_leaf(leaf_id) {
            log::debug!("Ignoring terminal exit for unknown pane {leaf_id}");
            return;
        }
        if let Some(callback) = self.terminal_close_callback.as_mut() {
            callback(leaf_id);
            return;
        }
        if !self.config.terminal.auto_close_on_exit {
            log::info!("Terminal in {leaf_id} exited; auto-close disabled, keeping pane");
            return;
        }
        log::info!("Terminal in {leaf_id} exited, closing pane");
        if let Err(e) = self.close_pane(leaf_id) {
            log::warn!("Failed to close pane {leaf_id} after terminal exit: {e}");
        }
    }

    // ── Event-loop turn ──────────────────────────────────────────────

    /// Deliver queued terminal exits, then due focus announcements.
    ///
    /// Returns the number of `WidgetReadyForFocus` events emitted.
    pub fn poll(&mut self, now: Instant) -> usize {
        let exited: Vec<PaneId> = self.exit_rx.try_iter().collect();
        for leaf_id in exited {
            self.notify_terminal_exited(&leaf_id);
        }

        let mut emitted = 0;
        for leaf_id in self.focus.take_ready(now) {
            if self.tree.contains_leaf(&leaf_id) {
                self.emit(PaneEvent::WidgetReadyForFocus { id: leaf_id });
                emitted += 1;
            }
        }
        emitted
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Snapshot of the layout and active pane.
    pub fn get_state(&self) -> PaneLayoutState {
        self.tree.serialize()
    }

    /// Replace the whole layout. On error the current layout is left untouched.
    pub fn set_state(&mut self, state: &PaneLayoutState) -> Result<(), PaneError> {
        let tree = PaneTree::deserialize(state)?;
        self.install_tree(tree);
        log::info!("Restored pane layout with {} pane(s)", self.tree.leaf_count());
        Ok(())
    }

    /// Like [`set_state`](Self::set_state), but falls back to a fresh
    /// single-pane layout when the state is rejected. Returns whether the state was used.
    pub fn restore_or_reset(&mut self, state: &PaneLayoutState) -> bool {
        match self.set_state(state) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Discarding saved pane layout: {e}");
                self.install_tree(PaneTree::new());
                false
            }
        }
    }

    fn install_tree(&mut self, tree: PaneTree) {
        self.focus.clear();
        for leaf_id in self.tree.leaf_ids() {
            self.widgets.release(&leaf_id);
        }
        self.tree = tree;
        self.create_widgets();
        self.emit(PaneEvent::LayoutChanged);
    }

    /// Build a widget for every leaf of the current tree.
    fn create_widgets(&mut self) {
        for leaf_id in self.tree.leaf_ids() {
            if let Some(leaf) = self.tree.leaf(&leaf_id) {
                self.widgets.create(&leaf_id, &leaf.widget_type);
            }
        }
    }

    // ── Cleanup ──────────────────────────────────────────────────────

    /// Drop pending focus waits, the close callback and queued exit notices.
    /// Widgets are left alive; the host tears them down with the factory.
    pub fn shutdown(&mut self) {
        let cancelled = self.focus.len();
        self.focus.clear();
        self.terminal_close_callback = None;
        let dropped = self.exit_rx.try_iter().count();
        log::debug!(
            "Pane controller shut down ({cancelled} pending focus, {dropped} exit notice(s) dropped)"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
