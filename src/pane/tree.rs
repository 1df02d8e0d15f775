// PaneTree: arena-backed binary tree with a leaf index and active-leaf tracking.

use std::collections::{HashMap, HashSet};

use super::{
    Leaf, NodeKind, Orientation, PaneId, PaneNode, Split, WidgetState, DEFAULT_RATIO, MAX_RATIO,
    MAX_SPLIT_DEPTH, MIN_RATIO,
};
use crate::error::PaneError;

/// The pane tree: owns every node, the leaf index and the active leaf.
///
/// All mutations keep these invariants:
/// - exactly one root, whose `parent` is `None`;
/// - every split has two children present in the arena, each pointing back at it;
/// - the leaf index holds exactly the leaves reachable from the root;
/// - the active leaf, when set, is in the leaf index;
/// - split ratios stay within `[MIN_RATIO, MAX_RATIO]`.
#[derive(Debug, Clone)]
pub struct PaneTree {
    nodes: HashMap<PaneId, PaneNode>,
    leaves: HashSet<PaneId>,
    root: PaneId,
    active: Option<PaneId>,
    next_id: u64,
}

impl PaneTree {
    /// Create a tree holding a single placeholder leaf, which is also active.
    pub fn new() -> Self {
        let root = PaneId::from("pane-1");
        let mut nodes = HashMap::new();
        nodes.insert(root.clone(), PaneNode::leaf(root.clone(), None, Leaf::placeholder()));
        let mut leaves = HashSet::new();
        leaves.insert(root.clone());
        Self {
            nodes,
            leaves,
            active: Some(root.clone()),
            root,
            next_id: 1,
        }
    }

    /// Assemble a tree from an already-built arena. Callers must `validate` the result.
    pub(super) fn from_arena(
        nodes: HashMap<PaneId, PaneNode>,
        root: PaneId,
        active: Option<PaneId>,
    ) -> Self {
        let leaves = nodes
            .values()
            .filter(|n| n.is_leaf())
            .map(|n| n.id.clone())
            .collect();
        let next_id = nodes.len() as u64;
        Self {
            nodes,
            leaves,
            root,
            active,
            next_id,
        }
    }

    // ── Inspection ───────────────────────────────────────────────────

    /// Id of the root node (a leaf or a split).
    pub fn root_id(&self) -> &PaneId {
        &self.root
    }

    /// Any node, leaf or split.
    pub fn node(&self, id: &PaneId) -> Option<&PaneNode> {
        self.nodes.get(id)
    }

    /// Leaf content for `id`, or `None` if `id` is unknown or a split.
    pub fn leaf(&self, id: &PaneId) -> Option<&Leaf> {
        self.nodes.get(id).and_then(PaneNode::as_leaf)
    }

    /// Split data for `id`, or `None` if `id` is unknown or a leaf.
    pub fn split_node(&self, id: &PaneId) -> Option<&Split> {
        self.nodes.get(id).and_then(PaneNode::as_split)
    }

    /// Whether `id` is in the leaf index.
    pub fn contains_leaf(&self, id: &PaneId) -> bool {
        self.leaves.contains(id)
    }

    /// Number of leaves; never zero.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Number of nodes in the arena, leaves and splits together.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The focused leaf.
    pub fn active_leaf_id(&self) -> Option<&PaneId> {
        self.active.as_ref()
    }

    /// Parent split of `id`; `None` for the root and unknown ids.
    pub fn parent_of(&self, id: &PaneId) -> Option<&PaneId> {
        self.nodes.get(id).and_then(|n| n.parent.as_ref())
    }

    /// Number of split ancestors of `id` (0 for the root).
    pub fn depth_of(&self, id: &PaneId) -> Option<usize> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            depth += 1;
            current = parent;
        }
        Some(depth)
    }

    /// The other child of `id`'s parent split.
    pub fn sibling_of(&self, id: &PaneId) -> Option<&PaneId> {
        let parent = self.parent_of(id)?;
        self.split_node(parent)?.other_child(id)
    }

    /// Leaf ids in pre-order (first child before second).
    pub fn leaf_ids(&self) -> Vec<PaneId> {
        let mut ids = Vec::with_capacity(self.leaves.len());
        self.walk(|node| {
            if node.is_leaf() {
                ids.push(node.id.clone());
            }
        });
        ids
    }

    /// Split node ids in pre-order.
    pub fn split_ids(&self) -> Vec<PaneId> {
        let mut ids = Vec::new();
        self.walk(|node| {
            if !node.is_leaf() {
                ids.push(node.id.clone());
            }
        });
        ids
    }

    /// Leaf after `from` in pre-order, wrapping around.
    pub fn next_leaf(&self, from: &PaneId) -> Option<PaneId> {
        let ids = self.leaf_ids();
        let idx = ids.iter().position(|id| id == from)?;
        Some(ids[(idx + 1) % ids.len()].clone())
    }

    /// Leaf before `from` in pre-order, wrapping around.
    pub fn prev_leaf(&self, from: &PaneId) -> Option<PaneId> {
        let ids = self.leaf_ids();
        let idx = ids.iter().position(|id| id == from)?;
        let prev = if idx == 0 { ids.len() - 1 } else { idx - 1 };
        Some(ids[prev].clone())
    }

    /// Visit reachable nodes in pre-order.
    pub(super) fn walk<'a>(&'a self, mut visit: impl FnMut(&'a PaneNode)) {
        let mut stack = vec![&self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            visit(node);
            if let NodeKind::Split(split) = &node.kind {
                stack.push(&split.second);
                stack.push(&split.first);
            }
        }
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Split `leaf_id`, placing a new `new_widget_type` leaf second.
    ///
    /// The new split takes the leaf's old slot (or becomes the root). The new
    /// leaf becomes active. Returns `None` if `leaf_id` is not a leaf or
    /// already sits at `MAX_SPLIT_DEPTH`.
    pub fn split(
        &mut self,
        leaf_id: &PaneId,
        orientation: Orientation,
        new_widget_type: &str,
    ) -> Option<PaneId> {
        if !self.leaves.contains(leaf_id) {
            return None;
        }
        if self.depth_of(leaf_id)? >= MAX_SPLIT_DEPTH {
            log::warn!("Refusing to split {leaf_id}: already {MAX_SPLIT_DEPTH} splits deep");
            return None;
        }
        let parent = self.nodes.get(leaf_id)?.parent.clone();

        let split_id = self.allocate_id("split");
        let new_id = self.allocate_id("pane");

        self.nodes.insert(
            new_id.clone(),
            PaneNode::leaf(new_id.clone(), Some(split_id.clone()), Leaf::new(new_widget_type)),
        );
        self.nodes.insert(
            split_id.clone(),
            PaneNode::split(
                split_id.clone(),
                parent.clone(),
                Split::new(orientation, DEFAULT_RATIO, leaf_id.clone(), new_id.clone()),
            ),
        );
        if let Some(node) = self.nodes.get_mut(leaf_id) {
            node.parent = Some(split_id.clone());
        }
        match parent {
            Some(parent_id) => {
                self.replace_child(&parent_id, leaf_id, split_id.clone());
            }
            None => self.root = split_id.clone(),
        }

        self.leaves.insert(new_id.clone());
        self.active = Some(new_id.clone());
        log::debug!(
            "Split {leaf_id} {} into {split_id}, new leaf {new_id} ({new_widget_type})",
            orientation.as_str()
        );
        Some(new_id)
    }

    /// Close `leaf_id`, promoting its sibling into the parent split's slot.
    ///
    /// Closing the last leaf resets it to a placeholder in place instead.
    pub fn close(&mut self, leaf_id: &PaneId) -> bool {
        if !self.leaves.contains(leaf_id) {
            return false;
        }
        let Some(parent_id) = self.parent_of(leaf_id).cloned() else {
            // Parentless leaf is the sole root: keep it, drop its content.
            if let Some(NodeKind::Leaf(leaf)) = self.nodes.get_mut(leaf_id).map(|n| &mut n.kind) {
                leaf.reset();
            }
            self.active = Some(leaf_id.clone());
            log::debug!("Reset last leaf {leaf_id} to placeholder");
            return true;
        };

        let Some((sibling_id, grandparent_id)) = self.nodes.get(&parent_id).and_then(|parent| {
            let sibling = parent.as_split()?.other_child(leaf_id)?.clone();
            Some((sibling, parent.parent.clone()))
        }) else {
            log::warn!("Leaf {leaf_id} has a broken parent link to {parent_id}");
            return false;
        };

        match &grandparent_id {
            Some(gp) => {
                self.replace_child(gp, &parent_id, sibling_id.clone());
            }
            None => self.root = sibling_id.clone(),
        }
        if let Some(sibling) = self.nodes.get_mut(&sibling_id) {
            sibling.parent = grandparent_id;
        }
        self.nodes.remove(&parent_id);
        self.nodes.remove(leaf_id);
        self.leaves.remove(leaf_id);

        if self.active.as_ref() == Some(leaf_id) {
            self.active = self.first_leaf();
        }
        log::debug!("Closed {leaf_id}, promoted {sibling_id} over {parent_id}");
        true
    }

    /// Set a split's ratio, clamped to `[MIN_RATIO, MAX_RATIO]`.
    /// Returns false for unknown ids, leaves, and non-finite ratios.
    pub fn update_ratio(&mut self, split_id: &PaneId, ratio: f32) -> bool {
        if !ratio.is_finite() {
            return false;
        }
        match self.nodes.get_mut(split_id).map(|n| &mut n.kind) {
            Some(NodeKind::Split(split)) => {
                split.set_ratio(ratio);
                log::debug!("Split {split_id} ratio -> {}", split.ratio());
                true
            }
            _ => false,
        }
    }

    /// Swap a leaf's widget type in place, clearing its widget state.
    pub fn change_leaf_type(&mut self, leaf_id: &PaneId, new_type: &str) -> bool {
        match self.leaf_mut(leaf_id) {
            Some(leaf) => {
                leaf.widget_type = new_type.to_string();
                leaf.widget_state.clear();
                true
            }
            None => false,
        }
    }

    /// Replace a leaf's opaque widget state (kept for persistence only).
    pub fn set_widget_state(&mut self, leaf_id: &PaneId, state: WidgetState) -> bool {
        match self.leaf_mut(leaf_id) {
            Some(leaf) => {
                leaf.widget_state = state;
                true
            }
            None => false,
        }
    }

    /// Make `leaf_id` the active leaf. No-op returning false if it is not a leaf.
    pub fn set_active(&mut self, leaf_id: &PaneId) -> bool {
        if self.leaves.contains(leaf_id) {
            self.active = Some(leaf_id.clone());
            true
        } else {
            false
        }
    }

    // ── Validation ───────────────────────────────────────────────────

    /// Check every structural invariant, reporting the first violation.
    pub fn validate(&self) -> Result<(), PaneError> {
        let root = self
            .nodes
            .get(&self.root)
            .ok_or_else(|| PaneError::malformed(format!("root {} missing", self.root)))?;
        if root.parent.is_some() {
            return Err(PaneError::malformed(format!("root {} has a parent", self.root)));
        }

        let mut visited = HashSet::new();
        let mut reachable_leaves = HashSet::new();
        let mut stack = vec![&self.root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(PaneError::malformed(format!("node {id} reachable twice")));
            }
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| PaneError::malformed(format!("node {id} missing")))?;
            match &node.kind {
                NodeKind::Leaf(_) => {
                    reachable_leaves.insert(id.clone());
                }
                NodeKind::Split(split) => {
                    if !(MIN_RATIO..=MAX_RATIO).contains(&split.ratio()) {
                        return Err(PaneError::malformed(format!(
                            "split {id} ratio {} out of range",
                            split.ratio()
                        )));
                    }
                    for child_id in [&split.first, &split.second] {
                        let child = self.nodes.get(child_id).ok_or_else(|| {
                            PaneError::malformed(format!("split {id} missing child {child_id}"))
                        })?;
                        if child.parent.as_ref() != Some(id) {
                            return Err(PaneError::malformed(format!(
                                "child {child_id} does not point back at split {id}"
                            )));
                        }
                        stack.push(child_id);
                    }
                }
            }
        }

        if visited.len() != self.nodes.len() {
            return Err(PaneError::malformed(format!(
                "{} unreachable node(s)",
                self.nodes.len() - visited.len()
            )));
        }
        if reachable_leaves != self.leaves {
            return Err(PaneError::malformed("leaf index out of sync with tree"));
        }
        match &self.active {
            Some(active) if !self.leaves.contains(active) => Err(PaneError::malformed(format!(
                "active leaf {active} is not in the tree"
            ))),
            None if !self.leaves.is_empty() => Err(PaneError::malformed("no active leaf")),
            _ => Ok(()),
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn leaf_mut(&mut self, leaf_id: &PaneId) -> Option<&mut Leaf> {
        match self.nodes.get_mut(leaf_id).map(|n| &mut n.kind) {
            Some(NodeKind::Leaf(leaf)) => Some(leaf),
            _ => None,
        }
    }

    fn replace_child(&mut self, parent_id: &PaneId, old: &PaneId, new: PaneId) -> bool {
        match self.nodes.get_mut(parent_id).map(|n| &mut n.kind) {
            Some(NodeKind::Split(split)) => split.replace_child(old, new),
            _ => false,
        }
    }

    /// First leaf in pre-order.
    fn first_leaf(&self) -> Option<PaneId> {
        let mut id = &self.root;
        loop {
            match &self.nodes.get(id)?.kind {
                NodeKind::Leaf(_) => return Some(id.clone()),
                NodeKind::Split(split) => id = &split.first,
            }
        }
    }

    fn allocate_id(&mut self, prefix: &str) -> PaneId {
        loop {
            self.next_id += 1;
            let id = PaneId::from(format!("{prefix}-{}", self.next_id));
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }
}

impl Default for PaneTree {
    fn default() -> Self {
        Self::new()
    }
}
