//! Reactive Primitives
//!
//! This module implements the push-based reactive core: cells, computed
//! values, collections, derived whole-array operations, and the `when_any`
//! combinator.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A Cell holds a current value and broadcasts every new one to its
//! observers, synchronously and in subscription order. A new observer
//! receives the current value immediately (replay-latest); emissions that
//! happened before it subscribed are gone; there is no buffering beyond
//! the latest value.
//!
//! ## Computed values
//!
//! A Computed derives a value from a source cell through a projection. It
//! keeps one persistent internal subscription alive for its whole lifetime,
//! so `get()` is always current even with zero external subscribers, and it
//! republishes only when the projected value actually changed.
//!
//! ## Collections
//!
//! A Collection is a cell whose value is an array, with array-shaped
//! mutators. Every mutation publishes a complete fresh array; the
//! previously published array is never touched, so downstream consumers
//! holding an old snapshot stay consistent.
//!
//! # Delivery model
//!
//! Everything here is single-threaded, cooperative, and synchronous:
//! `next()` drives the entire dependent chain to completion before
//! returning. A `next()` issued re-entrantly from inside an observer
//! callback is deferred through a single-slot trampoline and delivered
//! after the current pass, keeping ordering deterministic and the call
//! stack bounded.

mod cell;
mod collection;
mod computed;
mod observer;
mod ops;
mod when_any;

pub use cell::Cell;
pub use collection::Collection;
pub use computed::Computed;
pub use observer::{ObserverId, Subscription};
pub use when_any::when_any;
