use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;
use crate::model::participant::{ResolvedParticipant, TypeDescriptor};

/// Shape classification of one declared/live attribute pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedKind {
    Primitive,
    Object,
    Collection,
    Enum,
    /// Classification failed; the node's secondary participant carries the
    /// triggering error.
    Unresolved,
}

/// Index of a node in a [`ResolvedModel`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

/// One pairing of a declared (primary) attribute and its live (secondary)
/// counterpart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedNode {
    kind: ResolvedKind,
    primary: ResolvedParticipant,
    secondary: ResolvedParticipant,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Primary-name index for O(1) child lookup. Not serialized; a
    /// deserialized model is diagnostic output only.
    #[serde(skip)]
    child_index: HashMap<String, NodeId>,
}

impl ResolvedNode {
    pub fn kind(&self) -> ResolvedKind {
        self.kind
    }

    pub fn primary_participant(&self) -> &ResolvedParticipant {
        &self.primary
    }

    pub fn secondary_participant(&self) -> &ResolvedParticipant {
        &self.secondary
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Arena holding the resolved pairing tree for one reconciliation run.
///
/// Nodes are addressed by index and hold parent indices instead of back
/// pointers, which keeps the tree serializable for diagnostics.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ResolvedModel {
    nodes: Vec<ResolvedNode>,
}

impl ResolvedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root node, when the model has been seeded.
    pub fn root(&self) -> Option<NodeId> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(NodeId(0))
        }
    }

    /// Seed the arena with its root pairing. Must be called on an empty model.
    pub fn add_root(
        &mut self,
        kind: ResolvedKind,
        primary: ResolvedParticipant,
        secondary: ResolvedParticipant,
    ) -> NodeId {
        debug_assert!(self.nodes.is_empty(), "root added to non-empty model");
        self.push_node(kind, primary, secondary, None)
    }

    /// Append a child pairing under `parent`, indexing it by the primary
    /// participant's name.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        kind: ResolvedKind,
        primary: ResolvedParticipant,
        secondary: ResolvedParticipant,
    ) -> NodeId {
        let id = self.push_node(kind, primary, secondary, Some(parent));
        let name = self.nodes[id.0].primary.name().to_string();
        let parent_node = &mut self.nodes[parent.0];
        parent_node.children.push(id);
        parent_node.child_index.insert(name, id);
        id
    }

    /// Append an `Unresolved` child carrying the classification error.
    pub fn add_unresolved(
        &mut self,
        parent: NodeId,
        name: &str,
        error: ResolutionError,
    ) -> NodeId {
        let participant =
            ResolvedParticipant::failed(name, TypeDescriptor::unknown(), error);
        self.add_child(parent, ResolvedKind::Unresolved, participant.clone(), participant)
    }

    fn push_node(
        &mut self,
        kind: ResolvedKind,
        primary: ResolvedParticipant,
        secondary: ResolvedParticipant,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ResolvedNode {
            kind,
            primary,
            secondary,
            parent,
            children: Vec::new(),
            child_index: HashMap::new(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &ResolvedNode {
        &self.nodes[id.0]
    }

    /// O(1) lookup of a direct child by its primary participant's name.
    pub fn child_by_primary_id(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent.0].child_index.get(name).copied()
    }

    pub fn contains_child_with_primary_id(&self, parent: NodeId, name: &str) -> bool {
        self.child_by_primary_id(parent, name).is_some()
    }

    /// Replace a node's secondary participant as later resolution refines it.
    pub fn update_secondary_participant(&mut self, id: NodeId, secondary: ResolvedParticipant) {
        self.nodes[id.0].secondary = secondary;
    }

    /// Depth-first iterator over node ids, parents before children.
    pub fn iter_depth_first(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack: Vec<NodeId> = self.root().into_iter().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let node = &self.nodes[id.0];
            stack.extend(node.children.iter().rev().copied());
            Some(id)
        })
    }
}
