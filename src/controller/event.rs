// Outbound notifications consumed by the renderer.

use serde::Serialize;

use crate::pane::PaneId;

/// Events emitted by the controller after tree mutations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PaneEvent {
    /// A new leaf exists.
    PaneAdded { id: PaneId },
    /// A leaf was removed from the tree.
    PaneRemoved { id: PaneId },
    /// `original` was split and `new` inserted beside it. Renderers can
    /// update incrementally instead of rebuilding the layout.
    PaneSplit { original: PaneId, new: PaneId },
    /// The active leaf changed.
    ActivePaneChanged { id: PaneId },
    /// A freshly split leaf's widget is initialized and can take focus.
    WidgetReadyForFocus { id: PaneId },
    /// A leaf's widget type changed in place.
    WidgetTypeChanged { id: PaneId, widget_type: String },
    /// The whole layout was replaced.
    LayoutChanged,
}
