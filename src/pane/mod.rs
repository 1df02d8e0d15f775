// Pane layout engine: binary tree of leaves and splits.

pub mod state;
pub mod tree;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use state::{PaneLayoutState, SerializedNode};
pub use tree::PaneTree;

/// Smallest ratio a split may hold.
pub const MIN_RATIO: f32 = 0.1;
/// Largest ratio a split may hold.
pub const MAX_RATIO: f32 = 0.9;
/// Ratio assigned to every freshly created split.
pub const DEFAULT_RATIO: f32 = 0.5;

/// Deepest a leaf may sit below the root (number of split ancestors).
///
/// Keeps persisted layouts within serde_json's nesting limit, with room left
/// for nested widget state.
pub const MAX_SPLIT_DEPTH: usize = 64;

/// Widget type of an empty pane.
pub const PLACEHOLDER_WIDGET: &str = "placeholder";

/// Opaque key/value blob owned by a leaf's content widget.
pub type WidgetState = serde_json::Map<String, serde_json::Value>;

/// Unique identifier of a node in the pane tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaneId(String);

impl PaneId {
    /// The id as a plain string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PaneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Axis along which a split divides its area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Children stacked top/bottom.
    #[default]
    Horizontal,
    /// Children side by side left/right.
    Vertical,
}

impl Orientation {
    /// Lowercase wire name (`"horizontal"` or `"vertical"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }

    /// Parse the lowercase wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "horizontal" => Some(Orientation::Horizontal),
            "vertical" => Some(Orientation::Vertical),
            _ => None,
        }
    }
}

/// Content pane: an opaque widget type tag plus its persisted state.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub widget_type: String,
    pub widget_state: WidgetState,
}

impl Leaf {
    pub fn new(widget_type: impl Into<String>) -> Self {
        Self {
            widget_type: widget_type.into(),
            widget_state: WidgetState::new(),
        }
    }

    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_WIDGET)
    }

    /// Put the leaf back into its empty state.
    pub fn reset(&mut self) {
        self.widget_type = PLACEHOLDER_WIDGET.to_string();
        self.widget_state.clear();
    }
}

/// Binary division of an area. Both children are owned by the tree arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub orientation: Orientation,
    ratio: f32,
    pub first: PaneId,
    pub second: PaneId,
}

impl Split {
    pub fn new(orientation: Orientation, ratio: f32, first: PaneId, second: PaneId) -> Self {
        Self {
            orientation,
            ratio: clamp_ratio(ratio),
            first,
            second,
        }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = clamp_ratio(ratio);
    }

    /// The child that is not `child`, if `child` belongs to this split.
    pub fn other_child(&self, child: &PaneId) -> Option<&PaneId> {
        if &self.first == child {
            Some(&self.second)
        } else if &self.second == child {
            Some(&self.first)
        } else {
            None
        }
    }

    /// Point whichever slot holds `old` at `new`. Returns false if `old` is not a child.
    pub fn replace_child(&mut self, old: &PaneId, new: PaneId) -> bool {
        if &self.first == old {
            self.first = new;
            true
        } else if &self.second == old {
            self.second = new;
            true
        } else {
            false
        }
    }
}

/// Leaf or split payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Leaf(Leaf),
    Split(Split),
}

/// A node in the pane tree arena.
///
/// `parent` is a back-reference used only for upward navigation; ownership
/// flows from the arena, never through it.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneNode {
    pub id: PaneId,
    pub parent: Option<PaneId>,
    pub kind: NodeKind,
}

impl PaneNode {
    /// Leaf node under `parent` (`None` for the root).
    pub fn leaf(id: PaneId, parent: Option<PaneId>, leaf: Leaf) -> Self {
        Self {
            id,
            parent,
            kind: NodeKind::Leaf(leaf),
        }
    }

    /// Split node under `parent` (`None` for the root).
    pub fn split(id: PaneId, parent: Option<PaneId>, split: Split) -> Self {
        Self {
            id,
            parent,
            kind: NodeKind::Split(split),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            NodeKind::Split(_) => None,
        }
    }

    pub fn as_split(&self) -> Option<&Split> {
        match &self.kind {
            NodeKind::Split(split) => Some(split),
            NodeKind::Leaf(_) => None,
        }
    }
}

/// Clamp a split ratio into `[MIN_RATIO, MAX_RATIO]` so neither side collapses.
pub fn clamp_ratio(ratio: f32) -> f32 {
    ratio.clamp(MIN_RATIO, MAX_RATIO)
}
