//! Cell Implementation
//!
//! A Cell is the fundamental reactive primitive. It holds a current value,
//! broadcasts every new value to its observers, and replays the current
//! value to each new observer.
//!
//! # How Cells Work
//!
//! 1. `next(value)` stores the value, then synchronously notifies every
//!    current observer in subscription order.
//!
//! 2. `subscribe` immediately invokes the callback once with the current
//!    value, then registers it for future emissions. There is no buffering
//!    beyond the latest value: emissions that happened before the
//!    subscription are gone.
//!
//! 3. `error`/`complete` are terminal. Observers receive the terminal
//!    notification and are dropped; any later `next` is a silent no-op.
//!
//! # Re-entrant `next`
//!
//! Delivery is single-threaded and synchronous, so an observer callback may
//! itself call `next()` on the cell it is observing. Such a call is deferred
//! into a single pending slot and delivered by the outer notification loop
//! once the current pass finishes. The stored value is updated immediately,
//! so a re-entrant `get()` observes the new value; only delivery is
//! deferred. The slot holds one value, consistent with the
//! no-buffering-beyond-latest rule.
//!
//! # Delivery isolation
//!
//! Observer callbacks are invoked with no internal lock held (the observer
//! list is snapshotted first). A panicking callback is caught and routed to
//! the exception sink so the remaining observers still get the value.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use smallvec::SmallVec;

use crate::error::{self, Error};

use super::observer::{Observer, Subscription};

/// Counter for generating unique cell IDs.
static CELL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique cell ID.
fn next_cell_id() -> u64 {
    CELL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Terminal state of a cell.
#[derive(Clone)]
enum Terminal {
    Errored(Arc<Error>),
    Completed,
}

struct CellState<T> {
    value: T,
    /// Latest value deferred by a re-entrant `next`.
    pending: Option<T>,
    /// A notification pass is currently running.
    notifying: bool,
    terminal: Option<Terminal>,
}

struct CellInner<T> {
    id: u64,
    state: RwLock<CellState<T>>,
    observers: RwLock<SmallVec<[Arc<Observer<T>>; 2]>>,
}

/// A reactive cell holding a value of type T.
///
/// Cloning a cell produces another handle to the same shared state.
///
/// # Example
///
/// ```rust,ignore
/// let count = Cell::new(0);
///
/// let sub = count.subscribe(|v| println!("count: {v}")); // prints 0
/// count.next(5);                                          // prints 5
/// sub.unsubscribe();
/// ```
pub struct Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<CellInner<T>>,
}

impl<T> Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new cell with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(CellInner {
                id: next_cell_id(),
                state: RwLock::new(CellState {
                    value,
                    pending: None,
                    notifying: false,
                    terminal: None,
                }),
                observers: RwLock::new(SmallVec::new()),
            }),
        }
    }

    /// Get the cell's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the current value. O(1), no side effects.
    ///
    /// Called from inside a notification, this observes the value being
    /// delivered (the store happens before any observer runs).
    pub fn get(&self) -> T {
        self.inner
            .state
            .read()
            .expect("cell state lock poisoned")
            .value
            .clone()
    }

    /// Store a new value and synchronously notify every current observer in
    /// subscription order.
    ///
    /// After `error` or `complete` this is a silent no-op. Called
    /// re-entrantly from an observer callback, the value is stored
    /// immediately but delivered only after the current pass finishes.
    pub fn next(&self, value: T) {
        let starts_pass = {
            let mut state = self.inner.state.write().expect("cell state lock poisoned");
            if state.terminal.is_some() {
                tracing::trace!(cell = self.inner.id, "next() after terminal event ignored");
                return;
            }
            state.value = value.clone();
            if state.notifying {
                tracing::trace!(cell = self.inner.id, "re-entrant next() deferred");
                state.pending = Some(value.clone());
                false
            } else {
                state.notifying = true;
                true
            }
        };

        if !starts_pass {
            return;
        }

        // Trampoline: drain deferred values until the chain settles.
        let mut current = value;
        loop {
            self.deliver(&current);

            let mut state = self.inner.state.write().expect("cell state lock poisoned");
            match state.pending.take() {
                Some(deferred) => {
                    drop(state);
                    current = deferred;
                }
                None => {
                    state.notifying = false;
                    break;
                }
            }
        }
    }

    /// Run one delivery pass over a snapshot of the observer list.
    fn deliver(&self, value: &T) {
        let observers: Vec<Arc<Observer<T>>> = self
            .inner
            .observers
            .read()
            .expect("cell observers lock poisoned")
            .iter()
            .cloned()
            .collect();

        for observer in observers {
            // The flag is re-checked per call so an observer that
            // unsubscribed mid-pass receives nothing further.
            if !observer.is_active() {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.next(value)));
            if outcome.is_err() {
                error::report(&Error::ObserverPanic(format!(
                    "observer {:?} of cell {}",
                    observer.id(),
                    self.inner.id
                )));
            }
        }
    }

    /// Subscribe with a next callback only.
    ///
    /// The callback is immediately invoked once with the current value, then
    /// registered for future emissions. Returns an idempotent disposer.
    pub fn subscribe<F>(&self, on_next: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_with(on_next, None, None)
    }

    /// Subscribe with the full callback triple.
    ///
    /// Subscribing to an already-terminated cell delivers the terminal
    /// notification immediately and registers nothing.
    pub fn subscribe_with<F>(
        &self,
        on_next: F,
        on_error: Option<Box<dyn Fn(&Error) + Send + Sync>>,
        on_complete: Option<Box<dyn Fn() + Send + Sync>>,
    ) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let observer = Arc::new(Observer::new(Box::new(on_next), on_error, on_complete));

        let terminal = {
            let state = self.inner.state.read().expect("cell state lock poisoned");
            state.terminal.clone()
        };
        if let Some(terminal) = terminal {
            match terminal {
                Terminal::Errored(err) => observer.error(&err),
                Terminal::Completed => observer.complete(),
            }
            return Subscription::inert();
        }

        // Replay the current value before registering, so an emission issued
        // from inside the replay callback is not delivered to the replaying
        // observer twice.
        let current = self.get();
        observer.next(&current);

        self.inner
            .observers
            .write()
            .expect("cell observers lock poisoned")
            .push(observer.clone());

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            observer.deactivate();
            if let Some(inner) = inner.upgrade() {
                inner
                    .observers
                    .write()
                    .expect("cell observers lock poisoned")
                    .retain(|o| o.id() != observer.id());
            }
        })
    }

    /// Terminate the cell with an error.
    ///
    /// Every current observer's error handler runs, then all observers are
    /// dropped. Subsequent `next`/`error`/`complete` calls are no-ops.
    pub fn error(&self, err: Error) {
        let err = Arc::new(err);
        {
            let mut state = self.inner.state.write().expect("cell state lock poisoned");
            if state.terminal.is_some() {
                tracing::trace!(cell = self.inner.id, "error() after terminal event ignored");
                return;
            }
            state.terminal = Some(Terminal::Errored(err.clone()));
        }

        let observers: Vec<Arc<Observer<T>>> = self
            .inner
            .observers
            .write()
            .expect("cell observers lock poisoned")
            .drain(..)
            .collect();
        for observer in observers {
            if !observer.is_active() {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.error(&err)));
            if outcome.is_err() {
                error::report(&Error::ObserverPanic(format!(
                    "error handler {:?} of cell {}",
                    observer.id(),
                    self.inner.id
                )));
            }
        }
    }

    /// Terminate the cell normally.
    pub fn complete(&self) {
        {
            let mut state = self.inner.state.write().expect("cell state lock poisoned");
            if state.terminal.is_some() {
                tracing::trace!(cell = self.inner.id, "complete() after terminal event ignored");
                return;
            }
            state.terminal = Some(Terminal::Completed);
        }

        let observers: Vec<Arc<Observer<T>>> = self
            .inner
            .observers
            .write()
            .expect("cell observers lock poisoned")
            .drain(..)
            .collect();
        for observer in observers {
            if !observer.is_active() {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| observer.complete()));
            if outcome.is_err() {
                error::report(&Error::ObserverPanic(format!(
                    "complete handler {:?} of cell {}",
                    observer.id(),
                    self.inner.id
                )));
            }
        }
    }

    /// Whether the cell has received `error` or `complete`.
    pub fn is_terminated(&self) -> bool {
        self.inner
            .state
            .read()
            .expect("cell state lock poisoned")
            .terminal
            .is_some()
    }

    /// Get the number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner
            .observers
            .read()
            .expect("cell observers lock poisoned")
            .len()
    }
}

impl<T> Clone for Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Cell<T>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.id())
            .field("value", &self.get())
            .field("observer_count", &self.observer_count())
            .field("terminated", &self.is_terminated())
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
    use std::sync::Mutex;

    #[test]
    fn subscriber_receives_current_value_synchronously() {
        let cell = Cell::new(7);
        let seen = Arc::new(AtomicI32::new(-1));
        let seen_clone = seen.clone();

        let _sub = cell.subscribe(move |v| {
            seen_clone.store(*v, Ordering::SeqCst);
        });

        // Replay happened before subscribe returned.
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn no_buffering_beyond_latest() {
        let cell = Cell::new(0);

        // No subscribers yet.
        cell.next(10);
        cell.next(8);

        let received: Arc<Mutex<Vec<i32>>> = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let _sub = cell.subscribe(move |v| {
            received_clone.lock().unwrap().push(*v);
        });

        // Exactly [8], never [10, 8].
        assert_eq!(*received.lock().unwrap(), vec![8]);
    }

    #[test]
    fn next_notifies_in_subscription_order() {
        let cell = Cell::new(0);
        let log: Arc<Mutex<Vec<(char, i32)>>> = Arc::new(Mutex::new(Vec::new()));

        let log_a = log.clone();
        let _a = cell.subscribe(move |v| log_a.lock().unwrap().push(('a', *v)));
        let log_b = log.clone();
        let _b = cell.subscribe(move |v| log_b.lock().unwrap().push(('b', *v)));

        log.lock().unwrap().clear();
        cell.next(1);

        assert_eq!(*log.lock().unwrap(), vec![('a', 1), ('b', 1)]);
    }

    #[test]
    fn reentrant_get_observes_new_value() {
        let cell = Cell::new(0);
        let observed = Arc::new(AtomicI32::new(-1));

        let cell_clone = cell.clone();
        let observed_clone = observed.clone();
        let _sub = cell.subscribe(move |_| {
            observed_clone.store(cell_clone.get(), Ordering::SeqCst);
        });

        cell.next(42);
        assert_eq!(observed.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn reentrant_next_is_deferred_not_interleaved() {
        let cell = Cell::new(0);
        let received: Arc<Mutex<Vec<i32>>> = Arc::new(Mutex::new(Vec::new()));

        // First subscriber bumps 1 to 2 from inside its own callback.
        let cell_clone = cell.clone();
        let _bumper = cell.subscribe(move |v| {
            if *v == 1 {
                cell_clone.next(2);
            }
        });

        let received_clone = received.clone();
        let _recorder = cell.subscribe(move |v| {
            received_clone.lock().unwrap().push(*v);
        });

        received.lock().unwrap().clear();
        cell.next(1);

        // The deferred 2 arrives after the full pass for 1, in order.
        assert_eq!(*received.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn reentrant_next_keeps_only_latest_deferred_value() {
        let cell = Cell::new(0);
        let received: Arc<Mutex<Vec<i32>>> = Arc::new(Mutex::new(Vec::new()));

        let cell_clone = cell.clone();
        let _bumper = cell.subscribe(move |v| {
            if *v == 1 {
                cell_clone.next(2);
                cell_clone.next(3);
            }
        });

        let received_clone = received.clone();
        let _recorder = cell.subscribe(move |v| {
            received_clone.lock().unwrap().push(*v);
        });

        received.lock().unwrap().clear();
        cell.next(1);

        assert_eq!(*received.lock().unwrap(), vec![1, 3]);
    }

    #[test]
    fn unsubscribe_during_delivery_suppresses_in_flight_notification() {
        let cell = Cell::new(0);
        let count = Arc::new(AtomicI32::new(0));

        // Holds its own subscription so it can dispose itself mid-pass.
        let self_sub: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let self_sub_clone = self_sub.clone();
        let first = cell.subscribe(move |v| {
            if *v == 1 {
                // Unsubscribe the *second* observer before it sees this value.
                if let Some(sub) = self_sub_clone.lock().unwrap().take() {
                    sub.unsubscribe();
                }
            }
        });

        let count_clone = count.clone();
        let second = cell.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        *self_sub.lock().unwrap() = Some(second);

        // Replay already counted once.
        assert_eq!(count.load(Ordering::SeqCst), 1);

        cell.next(1);

        // The in-flight 1 was never delivered to the disposed observer.
        assert_eq!(count.load(Ordering::SeqCst), 1);
        first.unsubscribe();
    }

    #[test]
    fn panicking_observer_does_not_block_others() {
        let cell = Cell::new(0);
        let count = Arc::new(AtomicI32::new(0));

        let _bad = cell.subscribe(|v: &i32| {
            if *v == 1 {
                panic!("observer bug");
            }
        });
        let count_clone = count.clone();
        let _good = cell.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        cell.next(1);

        // Replay plus the post-panic delivery.
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn next_after_complete_is_a_no_op() {
        let cell = Cell::new(1);
        let completed = Arc::new(AtomicI32::new(0));

        let completed_clone = completed.clone();
        let _sub = cell.subscribe_with(
            |_| {},
            None,
            Some(Box::new(move || {
                completed_clone.fetch_add(1, Ordering::SeqCst);
            })),
        );

        cell.complete();
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert!(cell.is_terminated());

        cell.next(99);
        cell.complete();

        // Value frozen at the last pre-terminal value.
        assert_eq!(cell.get(), 1);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn error_reaches_every_error_handler() {
        let cell = Cell::new(0);
        let errors = Arc::new(AtomicI32::new(0));

        for _ in 0..3 {
            let errors_clone = errors.clone();
            let _sub = cell.subscribe_with(
                |_| {},
                Some(Box::new(move |_| {
                    errors_clone.fetch_add(1, Ordering::SeqCst);
                })),
                None,
            );
        }

        cell.error(Error::Evaluation("upstream failed".into()));
        assert_eq!(errors.load(Ordering::SeqCst), 3);
        assert_eq!(cell.observer_count(), 0);
    }

    #[test]
    fn subscribing_after_complete_delivers_terminal_only() {
        let cell = Cell::new(5);
        cell.complete();

        let nexts = Arc::new(AtomicI32::new(0));
        let completes = Arc::new(AtomicI32::new(0));

        let nexts_clone = nexts.clone();
        let completes_clone = completes.clone();
        let sub = cell.subscribe_with(
            move |_: &i32| {
                nexts_clone.fetch_add(1, Ordering::SeqCst);
            },
            None,
            Some(Box::new(move || {
                completes_clone.fetch_add(1, Ordering::SeqCst);
            })),
        );

        assert_eq!(nexts.load(Ordering::SeqCst), 0);
        assert_eq!(completes.load(Ordering::SeqCst), 1);
        assert!(sub.is_disposed());
    }

    #[test]
    fn clone_shares_state() {
        let cell1 = Cell::new(0);
        let cell2 = cell1.clone();

        cell1.next(42);
        assert_eq!(cell2.get(), 42);
        assert_eq!(cell1.id(), cell2.id());
    }

    #[test]
    fn cell_ids_are_unique() {
        let c1 = Cell::new(0);
        let c2 = Cell::new(0);
        assert_ne!(c1.id(), c2.id());
    }
}
