//! Node-Tree Collaborator
//!
//! The reconciler never manipulates a concrete node tree directly; it talks
//! to a [`NodeOps`] implementation. [`ArenaTree`] is the in-crate reference
//! implementation, an explicit arena with deterministic teardown, and is
//! what every test renders into.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use indexmap::IndexMap;

/// Unique identifier for a node in a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// The kind of node in a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An ordinary content node.
    Element,

    /// An invisible marker node. The reconciler appends one after each
    /// region so insertions at the region's end have a stable reference
    /// sibling.
    Placeholder,
}

/// Payload stored per node in [`ArenaTree`].
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub label: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Contract between the reconciler and the node tree it renders into.
///
/// `insert_before` detaches the node from its current parent first, so it
/// doubles as the move primitive. All methods take `&self`; implementations
/// manage their own interior mutability.
pub trait NodeOps: Send + Sync {
    /// Create a detached content node.
    fn create_node(&self, label: &str) -> NodeId;

    /// Create a detached marker node.
    fn create_placeholder(&self, label: &str) -> NodeId;

    /// Deep-copy a subtree, returning the detached root of the copy.
    fn clone_subtree(&self, template: NodeId) -> NodeId;

    /// Attach `node` under `parent`, immediately before `reference`.
    /// Detaches `node` from its current parent first. A `reference` of
    /// `None`, or one that is not a child of `parent`, appends.
    fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>);

    /// Detach `node` from `parent` without destroying it.
    fn remove_child(&self, parent: NodeId, node: NodeId);

    /// Destroy a detached subtree and reclaim its storage.
    fn dispose_subtree(&self, node: NodeId);

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, parent: NodeId) -> Vec<NodeId>;

    fn label(&self, node: NodeId) -> Option<String>;
}

/// Reference [`NodeOps`] implementation: an `IndexMap`-backed arena.
///
/// Insertion-ordered storage keeps iteration deterministic, which the
/// teardown paths and the tests rely on.
#[derive(Debug, Default)]
pub struct ArenaTree {
    nodes: RwLock<IndexMap<NodeId, NodeData>>,
}

impl ArenaTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.read().expect("arena lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_node(&self, kind: NodeKind, label: &str) -> NodeId {
        let id = NodeId::new();
        let data = NodeData {
            kind,
            label: label.to_string(),
            parent: None,
            children: Vec::new(),
        };
        self.nodes
            .write()
            .expect("arena lock poisoned")
            .insert(id, data);
        id
    }

    fn detach_locked(nodes: &mut IndexMap<NodeId, NodeData>, node: NodeId) {
        let Some(parent) = nodes.get(&node).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent_data) = nodes.get_mut(&parent) {
            parent_data.children.retain(|c| *c != node);
        }
        if let Some(data) = nodes.get_mut(&node) {
            data.parent = None;
        }
    }

    fn clone_locked(nodes: &mut IndexMap<NodeId, NodeData>, template: NodeId) -> NodeId {
        let (kind, label, children) = {
            let data = nodes
                .get(&template)
                .expect("clone_subtree: unknown template node");
            (data.kind, data.label.clone(), data.children.clone())
        };
        let copy = NodeId::new();
        let copied_children: Vec<NodeId> = children
            .into_iter()
            .map(|child| {
                let child_copy = Self::clone_locked(nodes, child);
                if let Some(child_data) = nodes.get_mut(&child_copy) {
                    child_data.parent = Some(copy);
                }
                child_copy
            })
            .collect();
        nodes.insert(
            copy,
            NodeData {
                kind,
                label,
                parent: None,
                children: copied_children,
            },
        );
        copy
    }

    fn dispose_locked(nodes: &mut IndexMap<NodeId, NodeData>, node: NodeId) {
        let children = nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            Self::dispose_locked(nodes, child);
        }
        nodes.shift_remove(&node);
    }
}

impl NodeOps for ArenaTree {
    fn create_node(&self, label: &str) -> NodeId {
        self.insert_node(NodeKind::Element, label)
    }

    fn create_placeholder(&self, label: &str) -> NodeId {
        self.insert_node(NodeKind::Placeholder, label)
    }

    fn clone_subtree(&self, template: NodeId) -> NodeId {
        let mut nodes = self.nodes.write().expect("arena lock poisoned");
        Self::clone_locked(&mut nodes, template)
    }

    fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        let mut nodes = self.nodes.write().expect("arena lock poisoned");
        Self::detach_locked(&mut nodes, node);

        let position = reference.and_then(|r| {
            nodes
                .get(&parent)
                .and_then(|p| p.children.iter().position(|c| *c == r))
        });
        if let Some(parent_data) = nodes.get_mut(&parent) {
            match position {
                Some(at) => parent_data.children.insert(at, node),
                None => parent_data.children.push(node),
            }
        }
        if let Some(data) = nodes.get_mut(&node) {
            data.parent = Some(parent);
        }
    }

    fn remove_child(&self, parent: NodeId, node: NodeId) {
        let mut nodes = self.nodes.write().expect("arena lock poisoned");
        if nodes.get(&node).and_then(|n| n.parent) == Some(parent) {
            Self::detach_locked(&mut nodes, node);
        }
    }

    fn dispose_subtree(&self, node: NodeId) {
        let mut nodes = self.nodes.write().expect("arena lock poisoned");
        Self::detach_locked(&mut nodes, node);
        Self::dispose_locked(&mut nodes, node);
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes
            .read()
            .expect("arena lock poisoned")
            .get(&node)
            .and_then(|n| n.parent)
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let nodes = self.nodes.read().expect("arena lock poisoned");
        let parent = nodes.get(&node).and_then(|n| n.parent)?;
        let siblings = &nodes.get(&parent)?.children;
        let at = siblings.iter().position(|c| *c == node)?;
        siblings.get(at + 1).copied()
    }

    fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.nodes
            .read()
            .expect("arena lock poisoned")
            .get(&parent)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn label(&self, node: NodeId) -> Option<String> {
        self.nodes
            .read()
            .expect("arena lock poisoned")
            .get(&node)
            .map(|n| n.label.clone())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn insert_before_orders_children() {
        let tree = ArenaTree::new();
        let root = tree.create_node("root");
        let a = tree.create_node("a");
        let b = tree.create_node("b");
        let c = tree.create_node("c");

        tree.insert_before(root, a, None);
        tree.insert_before(root, c, None);
        tree.insert_before(root, b, Some(c));

        assert_eq!(tree.children(root), vec![a, b, c]);
        assert_eq!(tree.parent(b), Some(root));
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.next_sibling(c), None);
    }

    #[test]
    fn insert_before_detaches_from_previous_parent() {
        let tree = ArenaTree::new();
        let left = tree.create_node("left");
        let right = tree.create_node("right");
        let child = tree.create_node("child");

        tree.insert_before(left, child, None);
        assert_eq!(tree.children(left), vec![child]);

        // Reattaching under a different parent is a move.
        tree.insert_before(right, child, None);
        assert!(tree.children(left).is_empty());
        assert_eq!(tree.children(right), vec![child]);
        assert_eq!(tree.parent(child), Some(right));
    }

    #[test]
    fn missing_reference_appends() {
        let tree = ArenaTree::new();
        let root = tree.create_node("root");
        let a = tree.create_node("a");
        let b = tree.create_node("b");
        let stranger = tree.create_node("stranger");

        tree.insert_before(root, a, None);
        tree.insert_before(root, b, Some(stranger));

        assert_eq!(tree.children(root), vec![a, b]);
    }

    #[test]
    fn clone_subtree_copies_recursively() {
        let tree = ArenaTree::new();
        let root = tree.create_node("row");
        let inner = tree.create_node("text");
        tree.insert_before(root, inner, None);

        let copy = tree.clone_subtree(root);
        assert_ne!(copy, root);
        assert_eq!(tree.label(copy).as_deref(), Some("row"));
        assert_eq!(tree.parent(copy), None);

        let copied_children = tree.children(copy);
        assert_eq!(copied_children.len(), 1);
        assert_ne!(copied_children[0], inner);
        assert_eq!(tree.label(copied_children[0]).as_deref(), Some("text"));
    }

    #[test]
    fn remove_child_detaches_without_destroying() {
        let tree = ArenaTree::new();
        let root = tree.create_node("root");
        let child = tree.create_node("child");
        tree.insert_before(root, child, None);

        tree.remove_child(root, child);
        assert!(tree.children(root).is_empty());
        assert_eq!(tree.parent(child), None);
        assert_eq!(tree.label(child).as_deref(), Some("child"));
    }

    #[test]
    fn dispose_subtree_reclaims_storage() {
        let tree = ArenaTree::new();
        let root = tree.create_node("root");
        let child = tree.create_node("child");
        let grandchild = tree.create_node("grandchild");
        tree.insert_before(root, child, None);
        tree.insert_before(child, grandchild, None);
        assert_eq!(tree.len(), 3);

        tree.dispose_subtree(child);
        assert_eq!(tree.len(), 1);
        assert!(tree.children(root).is_empty());
        assert_eq!(tree.label(grandchild), None);
    }

    #[test]
    fn placeholder_kind_is_recorded() {
        let tree = ArenaTree::new();
        let marker = tree.create_placeholder("region-end");
        let nodes = tree.nodes.read().unwrap();
        assert_eq!(nodes.get(&marker).unwrap().kind, NodeKind::Placeholder);
    }
}
