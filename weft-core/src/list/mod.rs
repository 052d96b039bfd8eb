//! List Diffing
//!
//! A pure comparison engine for arrays: given an old and a new array, it
//! produces a delta script of added, deleted, and moved entries. The engine
//! has no dependency on the reactive core; the reconciler in `tree` is its
//! main consumer.

mod diff;

pub use diff::{apply, diff, diff_with_budget, Delta, ListDelta, MOVE_SCAN_MULTIPLIER};
