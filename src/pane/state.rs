// Layout persistence: plain nested snapshot of a pane tree and its active leaf.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    Leaf, NodeKind, Orientation, PaneId, PaneNode, PaneTree, Split, WidgetState, MAX_SPLIT_DEPTH,
};
use crate::error::PaneError;

/// Serializable snapshot of the whole layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaneLayoutState {
    pub tree: SerializedNode,
    pub active_pane: Option<PaneId>,
}

/// Serializable snapshot of one pane tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SerializedNode {
    Leaf {
        id: PaneId,
        widget_type: String,
        #[serde(default)]
        widget_state: WidgetState,
    },
    Split {
        id: PaneId,
        orientation: Orientation,
        ratio: f32,
        first: Box<SerializedNode>,
        second: Box<SerializedNode>,
    },
}

impl SerializedNode {
    pub fn id(&self) -> &PaneId {
        match self {
            SerializedNode::Leaf { id, .. } | SerializedNode::Split { id, .. } => id,
        }
    }
}

impl PaneLayoutState {
    pub fn to_json(&self) -> Result<String, PaneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a snapshot. Structural problems (e.g. a split without `second`) are `MalformedState`.
    ///
    /// serde_json stops at 128 levels of nesting. Trees built by `PaneTree`
    /// stay within `MAX_SPLIT_DEPTH`, which leaves the remainder for widget state.
    pub fn from_json(json: &str) -> Result<Self, PaneError> {
        serde_json::from_str(json).map_err(|e| PaneError::malformed(e.to_string()))
    }
}

impl PaneTree {
    /// Snapshot the tree and its active leaf.
    pub fn serialize(&self) -> PaneLayoutState {
        PaneLayoutState {
            tree: self.encode_node(self.root_id()),
            active_pane: self.active_leaf_id().cloned(),
        }
    }

    /// Rebuild a tree from a snapshot, rejecting anything that breaks the tree invariants.
    ///
    /// Ratios are clamped; duplicate ids, non-finite ratios, nesting deeper than
    /// `MAX_SPLIT_DEPTH` and an active pane that is not a leaf of the snapshot
    /// are errors. A missing active pane
    /// selects the first leaf.
    pub fn deserialize(state: &PaneLayoutState) -> Result<PaneTree, PaneError> {
        let mut nodes = HashMap::new();
        decode_node(&state.tree, None, 0, &mut nodes)?;
        let root = state.tree.id().clone();

        if let Some(active) = &state.active_pane {
            if !nodes.get(active).is_some_and(PaneNode::is_leaf) {
                return Err(PaneError::malformed(format!(
                    "active pane {active} is not a leaf of the layout"
                )));
            }
        }

        let mut tree = PaneTree::from_arena(nodes, root, state.active_pane.clone());
        if tree.active_leaf_id().is_none() {
            if let Some(first) = tree.leaf_ids().into_iter().next() {
                tree.set_active(&first);
            }
        }
        tree.validate()?;
        Ok(tree)
    }

    fn encode_node(&self, id: &PaneId) -> SerializedNode {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Leaf(leaf)) => SerializedNode::Leaf {
                id: id.clone(),
                widget_type: leaf.widget_type.clone(),
                widget_state: leaf.widget_state.clone(),
            },
            Some(NodeKind::Split(split)) => SerializedNode::Split {
                id: id.clone(),
                orientation: split.orientation,
                ratio: split.ratio(),
                first: Box::new(self.encode_node(&split.first)),
                second: Box::new(self.encode_node(&split.second)),
            },
            None => {
                log::error!("Pane tree references missing node {id}; saving it as a placeholder");
                SerializedNode::Leaf {
                    id: id.clone(),
                    widget_type: Leaf::placeholder().widget_type,
                    widget_state: WidgetState::new(),
                }
            }
        }
    }
}

fn decode_node(
    node: &SerializedNode,
    parent: Option<&PaneId>,
    depth: usize,
    nodes: &mut HashMap<PaneId, PaneNode>,
) -> Result<(), PaneError> {
    let id = node.id();
    if nodes.contains_key(id) {
        return Err(PaneError::malformed(format!("duplicate node id {id}")));
    }
    if depth > MAX_SPLIT_DEPTH {
        return Err(PaneError::malformed(format!(
            "node {id} nested deeper than {MAX_SPLIT_DEPTH} splits"
        )));
    }
    let parent = parent.cloned();
    match node {
        SerializedNode::Leaf {
            widget_type,
            widget_state,
            ..
        } => {
            let leaf = Leaf {
                widget_type: widget_type.clone(),
                widget_state: widget_state.clone(),
            };
            nodes.insert(id.clone(), PaneNode::leaf(id.clone(), parent, leaf));
        }
        SerializedNode::Split {
            orientation,
            ratio,
            first,
            second,
            ..
        } => {
            if !ratio.is_finite() {
                return Err(PaneError::malformed(format!("split {id} has ratio {ratio}")));
            }
            let split = Split::new(*orientation, *ratio, first.id().clone(), second.id().clone());
            nodes.insert(id.clone(), PaneNode::split(id.clone(), parent, split));
            decode_node(first, Some(id), depth + 1, nodes)?;
            decode_node(second, Some(id), depth + 1, nodes)?;
        }
    }
    Ok(())
}
