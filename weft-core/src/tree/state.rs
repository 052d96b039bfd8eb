//! Per-Node Binding State
//!
//! Every bound node gets a record here: the subscriptions to release when
//! the node goes away, an optional per-row index cell, and a flag marking
//! the node's descendants as claimed by a structural binding. The arena is
//! explicit and keyed by [`NodeId`], so teardown is deterministic and never
//! waits on finalizer timing.

use std::sync::RwLock;

use indexmap::IndexMap;

use crate::error::Error;
use crate::reactive::{Cell, Subscription};
use crate::tree::node::{NodeId, NodeOps};

#[derive(Default)]
struct NodeState {
    cleanups: Vec<Subscription>,
    index_cell: Option<Cell<usize>>,
    claimed: bool,
}

/// Arena of binding state, one record per bound node.
#[derive(Default)]
pub struct NodeStates {
    states: RwLock<IndexMap<NodeId, NodeState>>,
}

impl NodeStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a record exists for `node`.
    pub fn register(&self, node: NodeId) {
        self.states
            .write()
            .expect("node-state lock poisoned")
            .entry(node)
            .or_default();
    }

    /// Store a subscription to release when `node` is torn down.
    pub fn add_cleanup(&self, node: NodeId, subscription: Subscription) {
        self.states
            .write()
            .expect("node-state lock poisoned")
            .entry(node)
            .or_default()
            .cleanups
            .push(subscription);
    }

    /// Attach the per-row index cell for `node`.
    pub fn set_index_cell(&self, node: NodeId, cell: Cell<usize>) {
        self.states
            .write()
            .expect("node-state lock poisoned")
            .entry(node)
            .or_default()
            .index_cell = Some(cell);
    }

    /// The per-row index cell of `node`, if one is tracked.
    pub fn index_cell(&self, node: NodeId) -> Option<Cell<usize>> {
        self.states
            .read()
            .expect("node-state lock poisoned")
            .get(&node)
            .and_then(|s| s.index_cell.clone())
    }

    /// Mark `node`'s descendants as exclusively controlled by one structural
    /// binding. Errors when another binding already holds the claim.
    pub fn claim_descendants(&self, node: NodeId) -> Result<(), Error> {
        let mut states = self.states.write().expect("node-state lock poisoned");
        let state = states.entry(node).or_default();
        if state.claimed {
            return Err(Error::DescendantsClaimed { node: node.raw() });
        }
        state.claimed = true;
        Ok(())
    }

    /// Release a descendant claim, if held.
    pub fn release_claim(&self, node: NodeId) {
        if let Some(state) = self
            .states
            .write()
            .expect("node-state lock poisoned")
            .get_mut(&node)
        {
            state.claimed = false;
        }
    }

    /// Whether `node` currently has a record.
    pub fn is_registered(&self, node: NodeId) -> bool {
        self.states
            .read()
            .expect("node-state lock poisoned")
            .contains_key(&node)
    }

    /// Recursively release the state of `node` and every descendant:
    /// depth-first, children before the node itself, unsubscribing each
    /// record's cleanups as it is removed.
    pub fn teardown(&self, tree: &dyn NodeOps, node: NodeId) {
        for child in tree.children(node) {
            self.teardown(tree, child);
        }
        let removed = self
            .states
            .write()
            .expect("node-state lock poisoned")
            .shift_remove(&node);
        if let Some(state) = removed {
            for subscription in state.cleanups {
                subscription.unsubscribe();
            }
        }
    }
}

impl std::fmt::Debug for NodeStates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let states = self.states.read().expect("node-state lock poisoned");
        f.debug_struct("NodeStates")
            .field("tracked", &states.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
