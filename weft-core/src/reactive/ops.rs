//! Derived Whole-Array Operations
//!
//! Each operation consumes a reactive array (a `Collection<T>` or an
//! already-derived `Computed<Vec<T>>`), transforms the *entire* array on
//! every upstream emission, and wraps the result as a `Computed`. There is
//! no incremental sub-array recomputation here by design: a change
//! recomputes the whole derived array, and the `Computed` layer suppresses
//! republication when the result is unchanged.
//!
//! Chains compose freely: `map_array` then `filter_array` then
//! `reduce_array`, in any mix of collection- and computed-rooted stages.

use std::cmp::Ordering as CmpOrdering;

use super::cell::Cell;
use super::collection::Collection;
use super::computed::Computed;

/// Derive a computed from a reactive array by projecting the whole slice.
fn derive_slice<S, U, F>(source: &Cell<Vec<S>>, project: F) -> Computed<U>
where
    S: Clone + Send + Sync + 'static,
    U: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&[S]) -> U + Send + Sync + 'static,
{
    let initial = project(&source.get());
    Computed::new(source, initial, move |items: &Vec<S>| project(items))
}

// The same operation surface hangs off both array sources; the macro keeps
// the two impl blocks from drifting apart.
macro_rules! array_ops {
    () => {
        /// Transform every item; recomputes the whole array per change.
        pub fn map_array<U, F>(&self, f: F) -> Computed<Vec<U>>
        where
            U: Clone + PartialEq + Send + Sync + 'static,
            F: Fn(&T) -> U + Send + Sync + 'static,
        {
            derive_slice(self.cell(), move |items| items.iter().map(&f).collect())
        }

        /// Keep the items matching the predicate.
        pub fn filter_array<F>(&self, predicate: F) -> Computed<Vec<T>>
        where
            T: PartialEq,
            F: Fn(&T) -> bool + Send + Sync + 'static,
        {
            derive_slice(self.cell(), move |items| {
                items.iter().filter(|item| predicate(item)).cloned().collect()
            })
        }

        /// Sorted copy of the array under the given comparator.
        pub fn sort_array<F>(&self, comparator: F) -> Computed<Vec<T>>
        where
            T: PartialEq,
            F: Fn(&T, &T) -> CmpOrdering + Send + Sync + 'static,
        {
            derive_slice(self.cell(), move |items| {
                let mut sorted: Vec<T> = items.to_vec();
                sorted.sort_by(|a, b| comparator(a, b));
                sorted
            })
        }

        /// True when every item matches the predicate (true on empty).
        pub fn every_array<F>(&self, predicate: F) -> Computed<bool>
        where
            F: Fn(&T) -> bool + Send + Sync + 'static,
        {
            derive_slice(self.cell(), move |items| items.iter().all(|item| predicate(item)))
        }

        /// True when at least one item matches the predicate.
        pub fn some_array<F>(&self, predicate: F) -> Computed<bool>
        where
            F: Fn(&T) -> bool + Send + Sync + 'static,
        {
            derive_slice(self.cell(), move |items| items.iter().any(|item| predicate(item)))
        }

        /// Fold the whole array from `init` on every change.
        pub fn reduce_array<A, F>(&self, init: A, fold: F) -> Computed<A>
        where
            A: Clone + PartialEq + Send + Sync + 'static,
            F: Fn(A, &T) -> A + Send + Sync + 'static,
        {
            derive_slice(self.cell(), move |items| {
                items.iter().fold(init.clone(), |acc, item| fold(acc, item))
            })
        }

        /// Map every item to an array and concatenate the results.
        pub fn flat_map_array<U, F>(&self, f: F) -> Computed<Vec<U>>
        where
            U: Clone + PartialEq + Send + Sync + 'static,
            F: Fn(&T) -> Vec<U> + Send + Sync + 'static,
        {
            derive_slice(self.cell(), move |items| {
                items.iter().flat_map(|item| f(item)).collect()
            })
        }
    };
}

impl<T> Collection<T>
where
    T: Clone + Send + Sync + 'static,
{
    array_ops!();
}

impl<T> Computed<Vec<T>>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    array_ops!();
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn map_array_recomputes_per_change() {
        let origin = Collection::new(vec![1, 2, 3]);
        let doubled = origin.map_array(|v| v * 2);

        assert_eq!(doubled.get(), vec![2, 4, 6]);

        origin.push(4);
        assert_eq!(doubled.get(), vec![2, 4, 6, 8]);
    }

    #[test]
    fn filter_array_tracks_membership() {
        let origin = Collection::new(vec![1, 2, 3, 4]);
        let evens = origin.filter_array(|v| v % 2 == 0);

        assert_eq!(evens.get(), vec![2, 4]);

        origin.shift();
        origin.push(6);
        assert_eq!(evens.get(), vec![2, 4, 6]);
    }

    #[test]
    fn sort_array_leaves_origin_untouched() {
        let origin = Collection::new(vec![3, 1, 2]);
        let sorted = origin.sort_array(|a, b| a.cmp(b));

        assert_eq!(sorted.get(), vec![1, 2, 3]);
        assert_eq!(origin.get(), vec![3, 1, 2]);
    }

    #[test]
    fn every_array_follows_mutations() {
        let origin = Collection::new(vec![1, 2, 4, 6]);
        let all_even = origin.every_array(|v| v % 2 == 0);

        assert!(!all_even.get());

        origin.shift(); // removes 1
        assert!(all_even.get());

        origin.push(3);
        assert!(!all_even.get());
    }

    #[test]
    fn some_array_follows_mutations() {
        let origin = Collection::new(vec![1, 3, 5]);
        let any_even = origin.some_array(|v| v % 2 == 0);

        assert!(!any_even.get());

        origin.push(2);
        assert!(any_even.get());

        origin.pop();
        assert!(!any_even.get());
    }

    #[test]
    fn reduce_array_folds_from_init_each_time() {
        let origin = Collection::new(vec![1, 2, 3]);
        let sum = origin.reduce_array(0, |acc, v| acc + v);

        assert_eq!(sum.get(), 6);

        origin.push(10);
        assert_eq!(sum.get(), 16);

        origin.clear();
        assert_eq!(sum.get(), 0);
    }

    #[test]
    fn flat_map_array_concatenates() {
        let origin = Collection::new(vec![1, 3]);
        let pairs = origin.flat_map_array(|v| vec![*v, v + 1]);

        assert_eq!(pairs.get(), vec![1, 2, 3, 4]);

        origin.push(9);
        assert_eq!(pairs.get(), vec![1, 2, 3, 4, 9, 10]);
    }

    #[test]
    fn chains_compose_across_stages() {
        let origin = Collection::new(vec![1, 2, 3, 4, 5]);
        let tripled = origin.map_array(|v| v * 3);
        let big = tripled.filter_array(|v| *v > 6);
        let total = big.reduce_array(0, |acc, v| acc + v);

        assert_eq!(big.get(), vec![9, 12, 15]);
        assert_eq!(total.get(), 36);

        origin.shift(); // removes 1
        origin.push(6); // adds 18 to the tripled stage
        assert_eq!(big.get(), vec![9, 12, 15, 18]);
        assert_eq!(total.get(), 54);
    }

    #[test]
    fn derived_boolean_dedupes_republication() {
        let origin = Collection::new(vec![2, 4]);
        let all_even = origin.every_array(|v| v % 2 == 0);

        let notifications = Arc::new(AtomicI32::new(0));
        let notifications_clone = notifications.clone();
        let _sub = all_even.subscribe(move |_| {
            notifications_clone.fetch_add(1, Ordering::SeqCst);
        });
        notifications.store(0, Ordering::SeqCst);

        // Still all even: the derived value does not republish.
        origin.push(6);
        origin.push(8);
        assert_eq!(notifications.load(Ordering::SeqCst), 0);

        origin.push(3);
        assert_eq!(notifications.load(Ordering::SeqCst), 1);
    }
}
