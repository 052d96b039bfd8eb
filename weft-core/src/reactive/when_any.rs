//! The `when_any` Combinator
//!
//! Flattens a reactive collection of reactive cells into one derived
//! reactive array:
//!
//! - On every *structural* change of the outer collection, the previous
//!   membership is unsubscribed and the current membership subscribed,
//!   followed by exactly one flattened emission (the per-member replays are
//!   collapsed behind a priming flag).
//!
//! - On a value change of an already-tracked inner cell, the combinator
//!   re-emits the flattened array without re-subscribing the unaffected
//!   members.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use super::cell::Cell;
use super::collection::Collection;
use super::computed::Computed;
use super::observer::Subscription;

/// Flatten a collection of cells into a computed array of their current
/// values.
pub fn when_any<T>(source: &Collection<Cell<T>>) -> Computed<Vec<T>>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let out: Cell<Vec<T>> = Cell::new(Vec::new());
    let member_subs: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));

    let outer_sub = {
        let out = out.clone();
        let member_subs = Arc::clone(&member_subs);
        source.subscribe(move |members: &Vec<Cell<T>>| {
            let mut subs = member_subs
                .lock()
                .expect("when_any member subscriptions lock poisoned");
            for sub in subs.drain(..) {
                sub.unsubscribe();
            }

            // One slot per member, pre-filled so the flattened array has its
            // final shape before any member callback runs.
            let values: Arc<RwLock<Vec<T>>> = Arc::new(RwLock::new(
                members.iter().map(|member| member.get()).collect(),
            ));
            let priming = Arc::new(AtomicBool::new(true));

            for (slot, member) in members.iter().enumerate() {
                let values = Arc::clone(&values);
                let priming = Arc::clone(&priming);
                let out = out.clone();
                subs.push(member.subscribe(move |value: &T| {
                    values.write().expect("when_any values lock poisoned")[slot] = value.clone();
                    if !priming.load(Ordering::SeqCst) {
                        let snapshot = values
                            .read()
                            .expect("when_any values lock poisoned")
                            .clone();
                        out.next(snapshot);
                    }
                }));
            }

            priming.store(false, Ordering::SeqCst);
            let snapshot = values
                .read()
                .expect("when_any values lock poisoned")
                .clone();
            out.next(snapshot);
        })
    };

    // Wrap the raw output cell so equal consecutive arrays are suppressed.
    let flattened = Computed::new(&out, out.get(), |values| values.clone());
    flattened.attach_guard(outer_sub);
    flattened
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
