// Widget-factory collaborator: the content-widget layer as seen by the controller.

use std::collections::{HashMap, HashSet};

use crossbeam_channel::{Receiver, Sender};

use crate::pane::{PaneId, PLACEHOLDER_WIDGET};

/// Initialization state of a leaf's content widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Not built yet, or still initializing (spawning a process, connecting...).
    Pending,
    /// Initialized and able to take focus.
    Ready,
    /// Initialization failed; the widget will never become ready.
    Failed,
}

impl Readiness {
    pub fn is_settled(self) -> bool {
        !matches!(self, Readiness::Pending)
    }
}

/// The content-widget layer.
///
/// The controller calls `create` for every leaf it adds or retypes and
/// `release` for every leaf it removes, then watches readiness.
pub trait WidgetFactory {
    /// Whether `widget_type` names a widget this factory can build.
    fn supports(&self, widget_type: &str) -> bool;

    /// Build the content widget for `leaf_id`. Initialization may finish later.
    fn create(&mut self, leaf_id: &PaneId, widget_type: &str);

    /// Tear down the widget of `leaf_id` and drop any readiness subscriptions on it.
    fn release(&mut self, leaf_id: &PaneId);

    /// Current readiness of the widget hosted by `leaf_id`.
    fn readiness(&self, leaf_id: &PaneId) -> Readiness;

    /// One-shot subscription: the receiver gets a single message once the
    /// widget settles on `Ready` or `Failed`. Dropping the receiver cancels it.
    fn subscribe_ready(&mut self, leaf_id: &PaneId) -> Receiver<Readiness>;
}

/// In-memory widget registry with explicit readiness transitions.
///
/// Created widgets start at `default_readiness`; so do leaves it never saw.
#[derive(Debug)]
pub struct WidgetRegistry {
    known_types: HashSet<String>,
    default_readiness: Readiness,
    widgets: HashMap<PaneId, String>,
    states: HashMap<PaneId, Readiness>,
    waiters: HashMap<PaneId, Vec<Sender<Readiness>>>,
}

impl WidgetRegistry {
    /// Registry accepting `types` (the placeholder type is always accepted).
    pub fn new<I, S>(types: I, default_readiness: Readiness) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut known_types: HashSet<String> = types.into_iter().map(Into::into).collect();
        known_types.insert(PLACEHOLDER_WIDGET.to_string());
        Self {
            known_types,
            default_readiness,
            widgets: HashMap::new(),
            states: HashMap::new(),
            waiters: HashMap::new(),
        }
    }

    /// Record a readiness transition, waking subscribers once it settles.
    pub fn set_readiness(&mut self, leaf_id: &PaneId, readiness: Readiness) {
        self.states.insert(leaf_id.clone(), readiness);
        if readiness.is_settled() {
            for tx in self.waiters.remove(leaf_id).unwrap_or_default() {
                // A dropped receiver means the controller cancelled the wait.
                let _ = tx.send(readiness);
            }
        }
    }

    /// Widget type currently built for `leaf_id`.
    pub fn widget_type(&self, leaf_id: &PaneId) -> Option<&str> {
        self.widgets.get(leaf_id).map(String::as_str)
    }

    /// Number of live widgets.
    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    /// Number of live subscriptions for `leaf_id`.
    pub fn waiter_count(&self, leaf_id: &PaneId) -> usize {
        self.waiters.get(leaf_id).map_or(0, Vec::len)
    }
}

impl WidgetFactory for WidgetRegistry {
    fn supports(&self, widget_type: &str) -> bool {
        self.known_types.contains(widget_type)
    }

    fn create(&mut self, leaf_id: &PaneId, widget_type: &str) {
        self.widgets.insert(leaf_id.clone(), widget_type.to_string());
        self.states.insert(leaf_id.clone(), self.default_readiness);
    }

    fn release(&mut self, leaf_id: &PaneId) {
        self.widgets.remove(leaf_id);
        self.states.remove(leaf_id);
        self.waiters.remove(leaf_id);
    }

    fn readiness(&self, leaf_id: &PaneId) -> Readiness {
        self.states
            .get(leaf_id)
            .copied()
            .unwrap_or(self.default_readiness)
    }

    fn subscribe_ready(&mut self, leaf_id: &PaneId) -> Receiver<Readiness> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let current = self.readiness(leaf_id);
        if current.is_settled() {
            let _ = tx.send(current);
        } else {
            self.waiters.entry(leaf_id.clone()).or_default().push(tx);
        }
        rx
    }
}
