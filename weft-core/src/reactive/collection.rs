//! Collection Implementation
//!
//! A Collection is a reactive cell whose value is an array. Every mutation
//! reads the current array, computes a fresh one, and publishes it
//! wholesale with `next`; the previously published array is never mutated
//! in place, so holders of an old snapshot keep seeing a consistent value.
//!
//! Mutators follow standard whole-array semantics: `pop`/`shift` on an
//! empty array return `None` without panicking, `splice` clamps its range
//! to the array bounds and returns the removed elements. The multi-item
//! mutators (`push_all`/`unshift_all`) reject an empty item list with an
//! invalid-argument error rather than silently publishing an unchanged
//! array.

use std::cmp::Ordering as CmpOrdering;

use crate::error::Error;

use super::cell::Cell;
use super::observer::Subscription;

/// A reactive array.
///
/// Cloning a collection produces another handle to the same shared state.
pub struct Collection<T>
where
    T: Clone + Send + Sync + 'static,
{
    cell: Cell<Vec<T>>,
}

impl<T> Collection<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new collection with the given initial items.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            cell: Cell::new(items),
        }
    }

    /// The underlying cell; used by derived-operation plumbing and the
    /// reconciler.
    pub(crate) fn cell(&self) -> &Cell<Vec<T>> {
        &self.cell
    }

    /// Get the collection's unique ID.
    pub fn id(&self) -> u64 {
        self.cell.id()
    }

    /// Snapshot of the current array.
    pub fn get(&self) -> Vec<T> {
        self.cell.get()
    }

    /// Number of items in the current array.
    pub fn len(&self) -> usize {
        self.cell.get().len()
    }

    /// Whether the current array is empty.
    pub fn is_empty(&self) -> bool {
        self.cell.get().is_empty()
    }

    /// Subscribe to array emissions. The current array is replayed once.
    pub fn subscribe<F>(&self, on_next: F) -> Subscription
    where
        F: Fn(&Vec<T>) + Send + Sync + 'static,
    {
        self.cell.subscribe(on_next)
    }

    /// Read the current array, let `f` build the successor in place, then
    /// publish wholesale.
    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        let mut items = self.cell.get();
        let result = f(&mut items);
        self.cell.next(items);
        result
    }

    /// Append one item.
    pub fn push(&self, item: T) {
        self.mutate(|items| items.push(item));
    }

    /// Append every item in `items`.
    ///
    /// An empty item list is an argument error: nothing would change, and
    /// the original call site almost certainly meant to pass something.
    pub fn push_all(&self, items: Vec<T>) -> Result<usize, Error> {
        if items.is_empty() {
            return Err(Error::InvalidArgument(
                "push_all requires at least one item".into(),
            ));
        }
        let count = items.len();
        self.mutate(|current| current.extend(items));
        Ok(count)
    }

    /// Remove and return the last item, `None` when empty.
    pub fn pop(&self) -> Option<T> {
        self.mutate(|items| items.pop())
    }

    /// Remove and return the first item, `None` when empty.
    pub fn shift(&self) -> Option<T> {
        self.mutate(|items| {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        })
    }

    /// Prepend one item.
    pub fn unshift(&self, item: T) {
        self.mutate(|items| items.insert(0, item));
    }

    /// Prepend every item in `items`, preserving their order.
    pub fn unshift_all(&self, items: Vec<T>) -> Result<usize, Error> {
        if items.is_empty() {
            return Err(Error::InvalidArgument(
                "unshift_all requires at least one item".into(),
            ));
        }
        let count = items.len();
        self.mutate(|current| {
            current.splice(0..0, items);
        });
        Ok(count)
    }

    /// Remove every item matching the predicate; returns the removed items
    /// in their original order.
    pub fn remove(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.mutate(|items| {
            let mut removed = Vec::new();
            items.retain(|item| {
                if predicate(item) {
                    removed.push(item.clone());
                    false
                } else {
                    true
                }
            });
            removed
        })
    }

    /// Reverse the array.
    pub fn reverse(&self) {
        self.mutate(|items| items.reverse());
    }

    /// Sort the array with the given comparator.
    pub fn sort_by(&self, comparator: impl Fn(&T, &T) -> CmpOrdering) {
        self.mutate(|items| items.sort_by(|a, b| comparator(a, b)));
    }

    /// Remove `count` items starting at `start`, returning them. Both
    /// bounds clamp to the array length.
    pub fn splice(&self, start: usize, count: usize) -> Vec<T> {
        self.mutate(|items| {
            let from = start.min(items.len());
            let to = from.saturating_add(count).min(items.len());
            items.drain(from..to).collect()
        })
    }

    /// Remove every item.
    pub fn clear(&self) {
        self.mutate(|items| items.clear());
    }

    /// Replace the whole array.
    pub fn replace(&self, items: Vec<T>) {
        self.cell.next(items);
    }
}

impl<T> Clone for Collection<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Collection<T>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("id", &self.id())
            .field("items", &self.get())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn mutators_publish_fresh_arrays() {
        let collection = Collection::new(vec![1, 2]);

        let snapshot_before = collection.get();
        collection.push(3);

        // The previously published array is untouched.
        assert_eq!(snapshot_before, vec![1, 2]);
        assert_eq!(collection.get(), vec![1, 2, 3]);
    }

    #[test]
    fn push_pop_shift_unshift() {
        let collection = Collection::new(vec![2]);

        collection.push(3);
        collection.unshift(1);
        assert_eq!(collection.get(), vec![1, 2, 3]);

        assert_eq!(collection.shift(), Some(1));
        assert_eq!(collection.pop(), Some(3));
        assert_eq!(collection.get(), vec![2]);
    }

    #[test]
    fn pop_and_shift_on_empty_return_none() {
        let collection: Collection<i32> = Collection::new(Vec::new());
        assert_eq!(collection.pop(), None);
        assert_eq!(collection.shift(), None);
    }

    #[test]
    fn push_all_with_empty_list_is_an_argument_error() {
        let collection = Collection::new(vec![1]);

        let err = collection.push_all(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(collection.get(), vec![1]);

        assert_eq!(collection.push_all(vec![2, 3]).unwrap(), 2);
        assert_eq!(collection.get(), vec![1, 2, 3]);
    }

    #[test]
    fn unshift_all_prepends_in_order() {
        let collection = Collection::new(vec![3]);

        assert!(collection.unshift_all(Vec::new()).is_err());
        assert_eq!(collection.unshift_all(vec![1, 2]).unwrap(), 2);
        assert_eq!(collection.get(), vec![1, 2, 3]);
    }

    #[test]
    fn remove_returns_removed_items_in_order() {
        let collection = Collection::new(vec![1, 2, 3, 4, 5, 6]);

        let removed = collection.remove(|v| v % 2 == 0);
        assert_eq!(removed, vec![2, 4, 6]);
        assert_eq!(collection.get(), vec![1, 3, 5]);
    }

    #[test]
    fn reverse_and_sort() {
        let collection = Collection::new(vec![3, 1, 2]);

        collection.sort_by(|a, b| a.cmp(b));
        assert_eq!(collection.get(), vec![1, 2, 3]);

        collection.reverse();
        assert_eq!(collection.get(), vec![3, 2, 1]);
    }

    #[test]
    fn splice_removes_and_returns_range() {
        let collection = Collection::new(vec![1, 2, 3, 4, 5]);

        let removed = collection.splice(1, 3);
        assert_eq!(removed, vec![2, 3, 4]);
        assert_eq!(collection.get(), vec![1, 5]);
    }

    #[test]
    fn splice_clamps_out_of_range_bounds() {
        let collection = Collection::new(vec![1, 2, 3]);

        assert_eq!(collection.splice(2, 10), vec![3]);
        assert_eq!(collection.splice(99, 5), Vec::<i32>::new());
        assert_eq!(collection.get(), vec![1, 2]);
    }

    #[test]
    fn clear_and_replace() {
        let collection = Collection::new(vec![1, 2, 3]);

        collection.clear();
        assert!(collection.is_empty());

        collection.replace(vec![7, 8]);
        assert_eq!(collection.get(), vec![7, 8]);
    }

    #[test]
    fn subscriber_sees_every_mutation() {
        let collection = Collection::new(vec![1]);
        let emissions = Arc::new(AtomicI32::new(0));
        let latest: Arc<Mutex<Vec<i32>>> = Arc::new(Mutex::new(Vec::new()));

        let emissions_clone = emissions.clone();
        let latest_clone = latest.clone();
        let _sub = collection.subscribe(move |items| {
            emissions_clone.fetch_add(1, Ordering::SeqCst);
            *latest_clone.lock().unwrap() = items.clone();
        });

        collection.push(2);
        collection.shift();

        // Replay plus two mutations.
        assert_eq!(emissions.load(Ordering::SeqCst), 3);
        assert_eq!(*latest.lock().unwrap(), vec![2]);
    }
}
