//! Incremental List Reconciliation
//!
//! A [`ListRegion`] keeps a run of sibling nodes, one cloned template
//! subtree per array item, synchronized with a reactive [`Collection`].
//! Each emission is diffed against the previously rendered array and the
//! delta is applied to the live tree strictly in the order
//! **delete → add → move**, so retained and moved rows keep their node
//! identity (and therefore any per-node state such as focus or bindings).
//!
//! The region is bracketed by an invisible placeholder appended after the
//! last row; insertions at the region's end anchor against it, which keeps
//! the region self-contained inside a parent that may hold other children.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{self, Error};
use crate::list::diff;
use crate::reactive::{Cell, Collection, Subscription};
use crate::tree::node::{NodeId, NodeOps};
use crate::tree::scope::Scope;
use crate::tree::state::NodeStates;

/// Everything a row binder needs to wire one freshly instantiated row.
pub struct RowContext<T> {
    /// Root node of the row's cloned subtree.
    pub node: NodeId,
    /// The array item this row renders.
    pub item: T,
    /// Per-row index cell, present when the region tracks indices.
    pub index: Option<Cell<usize>>,
    /// Child scope binding the item under the region's item name.
    pub scope: Arc<Scope<T>>,
}

/// Callback invoked once per instantiated row. Returned subscriptions are
/// released when the row is torn down. An `Err` aborts only this row's
/// bindings and is routed to the exception sink.
pub type RowBinder<T> = Arc<dyn Fn(&RowContext<T>) -> Result<Vec<Subscription>, Error> + Send + Sync>;

/// Tunables for one reconciled region.
#[derive(Debug, Clone)]
pub struct ListRegionOptions {
    /// Name the item is bound under in each row's child scope.
    pub item_name: String,
    /// Whether each row carries a live index cell.
    pub track_index: bool,
}

impl Default for ListRegionOptions {
    fn default() -> Self {
        Self {
            item_name: "item".to_string(),
            track_index: false,
        }
    }
}

/// One live row of the region.
struct RowSlot<T> {
    node: NodeId,
    item: T,
    index: Option<Cell<usize>>,
}

struct RegionInner<T> {
    tree: Arc<dyn NodeOps>,
    states: Arc<NodeStates>,
    parent: NodeId,
    template: NodeId,
    placeholder: NodeId,
    options: ListRegionOptions,
    binder: Option<RowBinder<T>>,
    scope: Arc<Scope<T>>,
    rows: RwLock<Vec<RowSlot<T>>>,
    prev: RwLock<Vec<T>>,
    source_sub: RwLock<Option<Subscription>>,
    // True only while this region owns the parent's descendant claim.
    holds_claim: AtomicBool,
}

/// A region of sibling nodes kept in sync with a [`Collection`].
pub struct ListRegion<T: Clone + PartialEq + Send + Sync + 'static> {
    inner: Arc<RegionInner<T>>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ListRegion<T> {
    /// Create an unbound region under `parent`, rendering one copy of
    /// `template` per item. The region's end-marker placeholder is created
    /// detached here and only attached to `parent` once [`bind`] wins the
    /// descendant claim, so a losing region leaves no trace in the tree.
    ///
    /// [`bind`]: ListRegion::bind
    pub fn new(
        tree: Arc<dyn NodeOps>,
        states: Arc<NodeStates>,
        parent: NodeId,
        template: NodeId,
        scope: Arc<Scope<T>>,
        options: ListRegionOptions,
        binder: Option<RowBinder<T>>,
    ) -> Self {
        let placeholder = tree.create_placeholder("list-region-end");
        Self {
            inner: Arc::new(RegionInner {
                tree,
                states,
                parent,
                template,
                placeholder,
                options,
                binder,
                scope,
                rows: RwLock::new(Vec::new()),
                prev: RwLock::new(Vec::new()),
                source_sub: RwLock::new(None),
                holds_claim: AtomicBool::new(false),
            }),
        }
    }

    /// Bind the region to `source`. Claims exclusive control of the
    /// parent's descendants; a conflicting claim reports to the exception
    /// sink and aborts only this binding.
    pub fn bind(&self, source: &Collection<T>) -> Result<(), Error> {
        if let Err(err) = self.inner.states.claim_descendants(self.inner.parent) {
            error::report(&err);
            return Err(err);
        }
        self.inner.holds_claim.store(true, Ordering::SeqCst);
        self.inner
            .tree
            .insert_before(self.inner.parent, self.inner.placeholder, None);

        let inner = Arc::clone(&self.inner);
        let subscription = source.subscribe(move |items| inner.apply(items));
        *self
            .inner
            .source_sub
            .write()
            .expect("region source lock poisoned") = Some(subscription);
        Ok(())
    }

    /// Dismantle every row, remove the placeholder, and release the claim
    /// when this region holds it. The region is inert afterwards.
    pub fn teardown(&self) {
        let taken = self
            .inner
            .source_sub
            .write()
            .expect("region source lock poisoned")
            .take();
        if let Some(subscription) = taken {
            subscription.unsubscribe();
        }

        // A full-delete pass against the empty array reuses the ordinary
        // reconciliation path, so teardown is exactly symmetric with setup.
        self.inner.apply(&[]);

        self.inner.tree.dispose_subtree(self.inner.placeholder);
        // A region whose bind lost the claim race never owned the claim,
        // so it must not drop the winner's.
        if self.inner.holds_claim.swap(false, Ordering::SeqCst) {
            self.inner.states.release_claim(self.inner.parent);
        }
    }

    /// Row count currently rendered.
    pub fn len(&self) -> usize {
        self.inner.rows.read().expect("region rows lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Root nodes of the live rows, in render order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.inner
            .rows
            .read()
            .expect("region rows lock poisoned")
            .iter()
            .map(|slot| slot.node)
            .collect()
    }

    /// The index cell of the row at `position`, when indices are tracked.
    pub fn index_cell(&self, position: usize) -> Option<Cell<usize>> {
        self.inner
            .rows
            .read()
            .expect("region rows lock poisoned")
            .get(position)
            .and_then(|slot| slot.index.clone())
    }

    /// The region's end-marker node.
    pub fn placeholder(&self) -> NodeId {
        self.inner.placeholder
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> RegionInner<T> {
    /// Reconcile the live rows against `new_items`.
    fn apply(&self, new_items: &[T]) {
        let previous = self.prev.read().expect("region prev lock poisoned").clone();
        let delta = diff(&previous, new_items);
        if !delta.is_empty() {
            tracing::debug!(
                added = delta.added.len(),
                deleted = delta.deleted.len(),
                moved = delta.moved.len(),
                "reconciling list region"
            );
        }

        // Delete, descending old index so each cached index stays valid
        // while earlier removals shrink the row vector.
        for deletion in delta.deleted.iter().rev() {
            let slot = self
                .rows
                .write()
                .expect("region rows lock poisoned")
                .remove(deletion.index);
            self.states.teardown(self.tree.as_ref(), slot.node);
            self.tree.dispose_subtree(slot.node);
        }
        self.resync_indices();

        // Add, ascending new index. Consecutive additions share one
        // reference sibling, so a run is inserted as a single fragment.
        let mut cursor = 0;
        while cursor < delta.added.len() {
            let run_start = cursor;
            while cursor + 1 < delta.added.len()
                && delta.added[cursor + 1].index == delta.added[cursor].index + 1
            {
                cursor += 1;
            }
            let reference = self.node_at(delta.added[run_start].index);
            for addition in &delta.added[run_start..=cursor] {
                self.instantiate_row(addition.value.clone(), addition.index, reference);
            }
            cursor += 1;
        }
        self.resync_indices();

        // Move, without teardown. Detach every moved row first, then place
        // in ascending target order: one-at-a-time relocation does not
        // converge when unprocessed move sources still occupy the slots
        // targets are measured against.
        let mut pending: Vec<(usize, RowSlot<T>)> = Vec::new();
        for relocation in &delta.moved {
            let Some(target) = relocation.moved_to else {
                continue;
            };
            let mut rows = self.rows.write().expect("region rows lock poisoned");
            if let Some(position) = rows.iter().position(|slot| slot.item == relocation.value) {
                pending.push((target, rows.remove(position)));
            }
        }
        pending.sort_by_key(|(target, _)| *target);
        for (target, slot) in pending {
            let reference = self.node_at(target);
            self.tree.insert_before(self.parent, slot.node, Some(reference));
            self.rows
                .write()
                .expect("region rows lock poisoned")
                .insert(target, slot);
        }
        self.resync_indices();

        *self.prev.write().expect("region prev lock poisoned") = new_items.to_vec();
    }

    /// Node currently occupying row `position`, or the end placeholder.
    fn node_at(&self, position: usize) -> NodeId {
        self.rows
            .read()
            .expect("region rows lock poisoned")
            .get(position)
            .map(|slot| slot.node)
            .unwrap_or(self.placeholder)
    }

    /// Clone the template, build the child scope, register state, attach the
    /// node, and run the binder. Binder errors abort only this row's
    /// bindings and go to the exception sink.
    fn instantiate_row(&self, item: T, position: usize, reference: NodeId) {
        let node = self.tree.clone_subtree(self.template);
        let scope = self.scope.child();
        scope.insert(self.options.item_name.clone(), item.clone());

        let index = self.options.track_index.then(|| Cell::new(position));
        self.states.register(node);
        if let Some(cell) = &index {
            self.states.set_index_cell(node, cell.clone());
        }

        self.tree.insert_before(self.parent, node, Some(reference));
        self.rows
            .write()
            .expect("region rows lock poisoned")
            .insert(
                position,
                RowSlot {
                    node,
                    item: item.clone(),
                    index: index.clone(),
                },
            );

        if let Some(binder) = &self.binder {
            let context = RowContext {
                node,
                item,
                index,
                scope,
            };
            match binder(&context) {
                Ok(subscriptions) => {
                    for subscription in subscriptions {
                        self.states.add_cleanup(node, subscription);
                    }
                }
                Err(err) => error::report(&err),
            }
        }
    }

    /// Push each row's position into its index cell, notifying only cells
    /// whose value changed. Net effect per phase: the moved or shifted rows
    /// see exactly one index emission each.
    fn resync_indices(&self) {
        let stale: Vec<(Cell<usize>, usize)> = {
            let rows = self.rows.read().expect("region rows lock poisoned");
            rows.iter()
                .enumerate()
                .filter_map(|(position, slot)| {
                    slot.index
                        .as_ref()
                        .filter(|cell| cell.get() != position)
                        .map(|cell| (cell.clone(), position))
                })
                .collect()
        };
        // Deliver outside the rows guard; observers may read the region.
        for (cell, position) in stale {
            cell.next(position);
        }
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> std::fmt::Debug for ListRegion<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListRegion")
            .field("parent", &self.inner.parent)
            .field("rows", &self.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
