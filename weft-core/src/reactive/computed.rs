//! Computed Implementation
//!
//! A Computed is a derived reactive value: a source cell, an initial value,
//! and a projection. It differs from a raw transformed stream in two ways:
//!
//! 1. It holds one persistent internal subscription to its source for its
//!    entire lifetime, independent of external subscriber count, so `get()`
//!    is always current as of the last source emission, even before any
//!    external subscriber attaches.
//!
//! 2. It republishes to external subscribers only when the projected value
//!    actually changed (distinct-until-changed, via `PartialEq`).
//!
//! Lifting an already-Computed source again returns a handle to the *same*
//! instance, observable by id equality.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::Error;

use super::cell::Cell;
use super::observer::Subscription;

/// Counter for generating unique computed IDs.
static COMPUTED_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique computed ID.
fn next_computed_id() -> u64 {
    COMPUTED_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

struct ComputedInner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    id: u64,
    /// Holds `latest`; external subscribers attach here and get replay.
    cell: Cell<T>,
    /// Keeps the internal source subscription(s) alive for the whole
    /// lifetime of the computed.
    guards: Mutex<Vec<Subscription>>,
}

/// A derived, deduplicated reactive value.
///
/// # Example
///
/// ```rust,ignore
/// let count = Cell::new(1);
/// let doubled = Computed::new(&count, 0, |v| v * 2);
///
/// assert_eq!(doubled.get(), 2); // current before any subscriber attaches
/// count.next(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<ComputedInner<T>>,
}

impl<T> Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a computed from a source cell, an initial value, and a
    /// projection.
    ///
    /// The source's current value is projected immediately (subscription
    /// replay), so `get()` is correct from construction onward. Source
    /// `error`/`complete` forward to external subscribers.
    pub fn new<S, F>(source: &Cell<S>, initial: T, project: F) -> Self
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        let cell = Cell::new(initial);

        let target = cell.clone();
        let on_error = {
            let cell = cell.clone();
            Box::new(move |err: &Error| cell.error(err.clone()))
        };
        let on_complete = {
            let cell = cell.clone();
            Box::new(move || cell.complete())
        };
        let guard = source.subscribe_with(
            move |value: &S| {
                let projected = project(value);
                if projected != target.get() {
                    target.next(projected);
                }
            },
            Some(on_error),
            Some(on_complete),
        );

        Self {
            inner: Arc::new(ComputedInner {
                id: next_computed_id(),
                cell,
                guards: Mutex::new(vec![guard]),
            }),
        }
    }

    /// Lift a raw cell into a computed (identity projection).
    pub fn from_cell(source: &Cell<T>) -> Self {
        Self::new(source, source.get(), |value| value.clone())
    }

    /// Lift an already-computed value.
    ///
    /// Idempotent: returns a handle to the same instance, never a new
    /// wrapper. `Computed::lift(&Computed::lift(&x)).id() == x.id()`.
    pub fn lift(source: &Computed<T>) -> Computed<T> {
        source.clone()
    }

    /// Keep an extra subscription alive for this computed's lifetime.
    pub(crate) fn attach_guard(&self, guard: Subscription) {
        self.inner
            .guards
            .lock()
            .expect("computed guards lock poisoned")
            .push(guard);
    }

    /// The internal cell; used by derived-operation plumbing.
    pub(crate) fn cell(&self) -> &Cell<T> {
        &self.inner.cell
    }

    /// Get the computed's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Read the latest value. Always current as of the last source
    /// emission, regardless of external subscriber count.
    pub fn get(&self) -> T {
        self.inner.cell.get()
    }

    /// Subscribe to value changes. The current value is replayed once;
    /// afterwards only distinct consecutive values are delivered.
    pub fn subscribe<F>(&self, on_next: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.cell.subscribe(on_next)
    }

    /// Subscribe with the full callback triple.
    pub fn subscribe_with<F>(
        &self,
        on_next: F,
        on_error: Option<Box<dyn Fn(&Error) + Send + Sync>>,
        on_complete: Option<Box<dyn Fn() + Send + Sync>>,
    ) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.cell.subscribe_with(on_next, on_error, on_complete)
    }

    /// Get the number of external subscribers.
    pub fn observer_count(&self) -> usize {
        self.inner.cell.observer_count()
    }
}

impl<T> Clone for Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Computed<T>
where
    T: Clone + PartialEq + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id())
            .field("latest", &self.get())
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn latest_is_current_without_subscribers() {
        let source = Cell::new(3);
        let doubled = Computed::new(&source, 0, |v| v * 2);

        // Projected at construction.
        assert_eq!(doubled.get(), 6);

        // Stays current with no external subscriber attached.
        source.next(10);
        assert_eq!(doubled.get(), 20);
    }

    #[test]
    fn distinct_until_changed() {
        let source = Cell::new(0);
        let computed = Computed::new(&source, 0, |v| *v);

        let notifications = Arc::new(AtomicI32::new(0));
        let notifications_clone = notifications.clone();
        let _sub = computed.subscribe(move |_| {
            notifications_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Replay of the current 0.
        assert_eq!(notifications.load(Ordering::SeqCst), 1);

        source.next(1);
        source.next(2);
        source.next(2);

        // Exactly two further notifications: for 1 and for 2.
        assert_eq!(notifications.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn projection_dedup_collapses_equal_outputs() {
        let source = Cell::new(1);
        let parity = Computed::new(&source, false, |v| v % 2 == 0);

        let notifications = Arc::new(AtomicI32::new(0));
        let notifications_clone = notifications.clone();
        let _sub = parity.subscribe(move |_| {
            notifications_clone.fetch_add(1, Ordering::SeqCst);
        });
        notifications.store(0, Ordering::SeqCst);

        source.next(3);
        source.next(5);
        assert_eq!(notifications.load(Ordering::SeqCst), 0);

        source.next(4);
        assert_eq!(notifications.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lift_is_idempotent() {
        let source = Cell::new(0);
        let computed = Computed::from_cell(&source);

        let lifted = Computed::lift(&computed);
        let lifted_twice = Computed::lift(&lifted);

        assert_eq!(computed.id(), lifted.id());
        assert_eq!(lifted.id(), lifted_twice.id());
    }

    #[test]
    fn from_cell_tracks_the_source() {
        let source = Cell::new(5);
        let lifted = Computed::from_cell(&source);

        assert_eq!(lifted.get(), 5);

        source.next(9);
        assert_eq!(lifted.get(), 9);
    }

    #[test]
    fn source_error_forwards_to_subscribers() {
        let source: Cell<i32> = Cell::new(0);
        let computed = Computed::from_cell(&source);

        let errors = Arc::new(AtomicI32::new(0));
        let errors_clone = errors.clone();
        let _sub = computed.subscribe_with(
            |_| {},
            Some(Box::new(move |_| {
                errors_clone.fetch_add(1, Ordering::SeqCst);
            })),
            None,
        );

        source.error(Error::Evaluation("source died".into()));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn source_complete_forwards_to_subscribers() {
        let source: Cell<i32> = Cell::new(0);
        let computed = Computed::from_cell(&source);

        let completes = Arc::new(AtomicI32::new(0));
        let completes_clone = completes.clone();
        let _sub = computed.subscribe_with(
            |_| {},
            None,
            Some(Box::new(move || {
                completes_clone.fetch_add(1, Ordering::SeqCst);
            })),
        );

        source.complete();
        assert_eq!(completes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clone_shares_state_and_id() {
        let source = Cell::new(2);
        let computed = Computed::new(&source, 0, |v| v + 1);
        let clone = computed.clone();

        assert_eq!(computed.id(), clone.id());

        source.next(10);
        assert_eq!(clone.get(), 11);
    }
}
