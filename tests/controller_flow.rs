//! End-to-end controller scenarios driven through the public API.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use pane_engine::pane::SerializedNode;
use pane_engine::{
    ActionRequest, Orientation, PaneAction, PaneConfig, PaneController, PaneEvent, PaneId,
    PaneLayoutState, Readiness, WidgetFactory, WidgetRegistry,
};

fn config() -> PaneConfig {
    let mut config = PaneConfig::default();
    config.split.new_widget_type = "editor".to_string();
    config
}

fn registry(default: Readiness) -> WidgetRegistry {
    WidgetRegistry::new(["editor", "terminal", "explorer"], default)
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(5)
}

fn request(json: &str) -> ActionRequest {
    ActionRequest::from_json(json).unwrap()
}

// ── Custom widget factory ───────────────────────────────────────────────

/// Factory whose widgets initialize "asynchronously": readiness is pushed
/// from the outside through `complete`.
#[derive(Default)]
struct SlowFactory {
    built: HashMap<PaneId, String>,
    waiting: HashMap<PaneId, Sender<Readiness>>,
    subscribed: Vec<PaneId>,
}

impl SlowFactory {
    fn complete(&mut self, id: &PaneId, readiness: Readiness) {
        if let Some(tx) = self.waiting.remove(id) {
            let _ = tx.send(readiness);
        }
    }
}

impl WidgetFactory for SlowFactory {
    fn supports(&self, widget_type: &str) -> bool {
        matches!(widget_type, "placeholder" | "editor" | "terminal")
    }

    fn create(&mut self, leaf_id: &PaneId, widget_type: &str) {
        self.built.insert(leaf_id.clone(), widget_type.to_string());
    }

    fn release(&mut self, leaf_id: &PaneId) {
        self.built.remove(leaf_id);
        self.waiting.remove(leaf_id);
    }

    fn readiness(&self, _leaf_id: &PaneId) -> Readiness {
        Readiness::Pending
    }

    fn subscribe_ready(&mut self, leaf_id: &PaneId) -> Receiver<Readiness> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.waiting.insert(leaf_id.clone(), tx);
        self.subscribed.push(leaf_id.clone());
        rx
    }
}

/// Factory that panics when asked about one particular widget type.
struct FragileFactory;

impl WidgetFactory for FragileFactory {
    fn supports(&self, widget_type: &str) -> bool {
        if widget_type == "broken" {
            panic!("widget backend crashed");
        }
        true
    }

    fn create(&mut self, _leaf_id: &PaneId, _widget_type: &str) {}

    fn release(&mut self, _leaf_id: &PaneId) {}

    fn readiness(&self, _leaf_id: &PaneId) -> Readiness {
        Readiness::Ready
    }

    fn subscribe_ready(&mut self, _leaf_id: &PaneId) -> Receiver<Readiness> {
        crossbeam_channel::never()
    }
}

// ── Scenario ────────────────────────────────────────────────────────────

#[test]
fn split_split_close_scenario() {
    let mut ctrl = PaneController::new(config(), registry(Readiness::Pending));
    let a = ctrl.tree().root_id().clone();
    assert_eq!(ctrl.leaf(&a).unwrap().widget_type, "placeholder");

    let split_v = PaneAction::Split {
        orientation: Some(Orientation::Vertical),
        target: None,
        widget_type: Some("editor".to_string()),
    };
    assert!(ctrl.handle_action(&a, split_v));
    let b = ctrl.active_pane().unwrap().clone();

    let split_h = PaneAction::Split {
        orientation: Some(Orientation::Horizontal),
        target: None,
        widget_type: Some("terminal".to_string()),
    };
    assert!(ctrl.handle_action(&b, split_h));
    let c = ctrl.active_pane().unwrap().clone();

    assert!(ctrl.handle_action(&a, PaneAction::Close));

    let tree = ctrl.tree();
    let root = tree.split_node(tree.root_id()).unwrap();
    assert_eq!(root.orientation, Orientation::Horizontal);
    assert_eq!(root.ratio(), 0.5);
    assert_eq!(root.first, b);
    assert_eq!(root.second, c);
    assert_eq!(tree.leaf(&b).unwrap().widget_type, "editor");
    assert_eq!(tree.leaf(&c).unwrap().widget_type, "terminal");
    assert_eq!(tree.leaf_ids(), vec![b.clone(), c.clone()]);
    assert!(tree.parent_of(tree.root_id()).is_none());
    assert!(tree.validate().is_ok());

    assert_eq!(
        ctrl.drain_events(),
        vec![
            PaneEvent::PaneAdded { id: b.clone() },
            PaneEvent::PaneSplit {
                original: a.clone(),
                new: b.clone()
            },
            PaneEvent::PaneAdded { id: c.clone() },
            PaneEvent::PaneSplit {
                original: b,
                new: c
            },
            PaneEvent::PaneRemoved { id: a },
        ]
    );
}

#[test]
fn wire_requests_drive_the_controller() {
    let mut ctrl = PaneController::new(config(), registry(Readiness::Ready));
    let a = ctrl.tree().root_id().clone();

    assert!(ctrl.handle_request(request(
        r#"{"action":"split","params":{"orientation":"vertical","new_type":"terminal"}}"#
    )));
    let b = ctrl.active_pane().unwrap().clone();
    assert_eq!(ctrl.leaf(&b).unwrap().widget_type, "terminal");

    let focus = format!(r#"{{"action":"focus","params":{{"leaf_id":"{a}"}}}}"#);
    assert!(ctrl.handle_request(request(&focus)));
    assert_eq!(ctrl.active_pane(), Some(&a));

    let change = format!(r#"{{"action":"change_type","params":{{"leaf_id":"{b}","new_type":"explorer"}}}}"#);
    assert!(ctrl.handle_request(request(&change)));
    assert_eq!(ctrl.leaf(&b).unwrap().widget_type, "explorer");

    assert!(!ctrl.handle_request(request(r#"{"action":"explode"}"#)));
    assert!(!ctrl.handle_request(request(
        r#"{"action":"close","params":{"leaf_id":"nowhere"}}"#
    )));

    assert!(ctrl.handle_request(request(r#"{"action":"close"}"#)));
    assert_eq!(ctrl.pane_count(), 1);
    assert!(ctrl.tree().contains_leaf(&b));
}

// ── Readiness handshake ─────────────────────────────────────────────────

#[test]
fn added_and_split_precede_ready_for_focus() {
    let mut ctrl = PaneController::new(config(), registry(Readiness::Ready));
    let a = ctrl.tree().root_id().clone();
    let b = ctrl.split_vertical(&a).unwrap();
    ctrl.poll(far_future());

    let events = ctrl.drain_events();
    let pos = |wanted: &PaneEvent| events.iter().position(|e| e == wanted).unwrap();
    let added = pos(&PaneEvent::PaneAdded { id: b.clone() });
    let split = pos(&PaneEvent::PaneSplit {
        original: a,
        new: b.clone(),
    });
    let ready = pos(&PaneEvent::WidgetReadyForFocus { id: b });
    assert!(added < split && split < ready);
}

#[test]
fn custom_factory_readiness_is_observed() {
    let mut ctrl = PaneController::new(config(), SlowFactory::default());
    let a = ctrl.tree().root_id().clone();
    let b = ctrl.split_vertical(&a).unwrap();
    let c = ctrl.split_horizontal(&b).unwrap();
    assert_eq!(ctrl.widgets().subscribed, vec![b.clone(), c.clone()]);
    ctrl.drain_events();

    assert_eq!(ctrl.poll(far_future()), 0);
    ctrl.widgets_mut().complete(&c, Readiness::Ready);
    ctrl.widgets_mut().complete(&b, Readiness::Failed);
    assert_eq!(ctrl.poll(Instant::now()), 1);
    assert_eq!(
        ctrl.drain_events(),
        vec![PaneEvent::WidgetReadyForFocus { id: c.clone() }]
    );
    assert!(!ctrl.is_focus_pending(&b));
    assert!(!ctrl.is_focus_pending(&c));
}

#[test]
fn custom_factory_builds_and_releases_widgets() {
    let mut ctrl = PaneController::new(config(), SlowFactory::default());
    let a = ctrl.tree().root_id().clone();
    let b = ctrl.split_vertical(&a).unwrap();
    assert_eq!(ctrl.widgets().built.get(&b).map(String::as_str), Some("editor"));
    assert!(ctrl.widgets().waiting.contains_key(&b));

    ctrl.close_pane(&b).unwrap();
    assert!(!ctrl.widgets().built.contains_key(&b));
    assert!(ctrl.widgets().waiting.is_empty());
    assert_eq!(ctrl.widgets().built.len(), 1);
}

#[test]
fn factory_panic_is_contained_at_action_boundary() {
    let mut ctrl = PaneController::new(config(), FragileFactory);
    let a = ctrl.tree().root_id().clone();

    let action = PaneAction::ChangeType {
        new_type: "broken".to_string(),
    };
    assert!(!ctrl.handle_action(&a, action));
    assert!(!ctrl.handle_request(request(
        r#"{"action":"split","params":{"new_type":"broken"}}"#
    )));
    assert_eq!(ctrl.pane_count(), 1);
    assert!(ctrl.tree().validate().is_ok());

    assert!(ctrl.handle_action(&a, PaneAction::split(Orientation::Vertical)));
    assert_eq!(ctrl.pane_count(), 2);
}

#[test]
fn custom_factory_rejects_unsupported_types() {
    let mut ctrl = PaneController::new(config(), SlowFactory::default());
    let a = ctrl.tree().root_id().clone();
    assert!(!ctrl.handle_action(
        &a,
        PaneAction::ChangeType {
            new_type: "explorer".to_string()
        }
    ));
    assert!(ctrl.handle_action(
        &a,
        PaneAction::ChangeType {
            new_type: "terminal".to_string()
        }
    ));
}

#[test]
fn ready_for_focus_never_references_closed_leaf() {
    let mut ctrl = PaneController::new(config(), registry(Readiness::Pending));
    let a = ctrl.tree().root_id().clone();
    let b = ctrl.split_vertical(&a).unwrap();
    let c = ctrl.split_vertical(&b).unwrap();

    ctrl.close_pane(&b).unwrap();
    ctrl.widgets_mut().set_readiness(&b, Readiness::Ready);
    ctrl.widgets_mut().set_readiness(&c, Readiness::Ready);
    ctrl.poll(far_future());

    let ready: Vec<PaneId> = ctrl
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            PaneEvent::WidgetReadyForFocus { id } => Some(id),
            _ => None,
        })
        .collect();
    assert_eq!(ready, vec![c]);
}

#[test]
fn events_receiver_sees_emissions() {
    let mut ctrl = PaneController::new(config(), registry(Readiness::Pending));
    let events = ctrl.events();
    let a = ctrl.tree().root_id().clone();
    ctrl.split_horizontal(&a).unwrap();
    assert_eq!(events.try_iter().count(), 2);
    assert!(ctrl.drain_events().is_empty());
}

// ── Terminal exit ───────────────────────────────────────────────────────

#[test]
fn terminal_exit_callback_then_auto_close() {
    let mut ctrl = PaneController::new(config(), registry(Readiness::Pending));
    let a = ctrl.tree().root_id().clone();
    let b = ctrl.split_vertical(&a).unwrap();
    let notifier = ctrl.terminal_exit_notifier();

    let exited = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&exited);
    ctrl.set_terminal_close_callback(move |id| sink.borrow_mut().push(id.clone()));
    notifier.send(b.clone()).unwrap();
    ctrl.poll(Instant::now());
    assert_eq!(*exited.borrow(), vec![b.clone()]);
    assert!(ctrl.tree().contains_leaf(&b));

    ctrl.clear_terminal_close_callback();
    notifier.send(b.clone()).unwrap();
    ctrl.poll(Instant::now());
    assert!(!ctrl.tree().contains_leaf(&b));
    assert_eq!(exited.borrow().len(), 1);
}

#[test]
fn terminal_exit_kept_when_auto_close_disabled() {
    let mut config = config();
    config.terminal.auto_close_on_exit = false;
    let mut ctrl = PaneController::new(config, registry(Readiness::Pending));
    let a = ctrl.tree().root_id().clone();
    let b = ctrl.split_vertical(&a).unwrap();
    ctrl.notify_terminal_exited(&b);
    assert!(ctrl.tree().contains_leaf(&b));
}

// ── Persistence ─────────────────────────────────────────────────────────

#[test]
fn state_survives_json_round_trip_into_new_controller() {
    let mut source = PaneController::new(config(), registry(Readiness::Pending));
    let a = source.tree().root_id().clone();
    let b = source.split_vertical(&a).unwrap();
    let split_id = source.tree().root_id().clone();
    source.resize_split(&split_id, 0.3);
    let mut widget_state = serde_json::Map::new();
    widget_state.insert("cwd".into(), serde_json::json!("/tmp"));
    source.update_widget_state(&b, widget_state.clone());
    source.set_active_pane(&a);

    let json = source.get_state().to_json().unwrap();
    let state = PaneLayoutState::from_json(&json).unwrap();

    let mut target = PaneController::new(config(), registry(Readiness::Pending));
    target.set_state(&state).unwrap();
    assert_eq!(target.drain_events(), vec![PaneEvent::LayoutChanged]);
    assert_eq!(target.active_pane(), Some(&a));
    assert_eq!(target.tree().split_node(&split_id).unwrap().ratio(), 0.3);
    assert_eq!(target.leaf(&b).unwrap().widget_state, widget_state);
    assert_eq!(target.get_state(), source.get_state());
}

#[test]
fn persisted_shape_uses_type_tags() {
    let ctrl = PaneController::new(config(), registry(Readiness::Pending));
    let value: serde_json::Value =
        serde_json::from_str(&ctrl.get_state().to_json().unwrap()).unwrap();
    assert_eq!(value["tree"]["type"], "leaf");
    assert_eq!(value["tree"]["widget_type"], "placeholder");
    assert_eq!(value["active_pane"], value["tree"]["id"]);
}

#[test]
fn malformed_state_falls_back_to_fresh_tree() {
    let json = r#"{
        "tree": {"type": "split", "id": "s", "orientation": "vertical", "ratio": 0.5,
                 "first": {"type": "leaf", "id": "a", "widget_type": "editor"}},
        "active_pane": "a"
    }"#;
    assert!(PaneLayoutState::from_json(json).is_err());

    let duplicate = PaneLayoutState {
        tree: SerializedNode::Split {
            id: "s".into(),
            orientation: Orientation::Vertical,
            ratio: 0.5,
            first: Box::new(SerializedNode::Leaf {
                id: "a".into(),
                widget_type: "editor".into(),
                widget_state: Default::default(),
            }),
            second: Box::new(SerializedNode::Leaf {
                id: "a".into(),
                widget_type: "editor".into(),
                widget_state: Default::default(),
            }),
        },
        active_pane: None,
    };

    let mut ctrl = PaneController::new(config(), registry(Readiness::Pending));
    let a = ctrl.tree().root_id().clone();
    ctrl.split_vertical(&a).unwrap();
    ctrl.drain_events();

    assert!(!ctrl.restore_or_reset(&duplicate));
    assert_eq!(ctrl.pane_count(), 1);
    assert!(ctrl.tree().validate().is_ok());
    assert_eq!(ctrl.drain_events(), vec![PaneEvent::LayoutChanged]);
}
