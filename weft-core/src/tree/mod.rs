//! Node Trees and Incremental Reconciliation
//!
//! The rendering half of the crate. A host node tree sits behind the
//! [`NodeOps`] collaborator trait ([`ArenaTree`] is the in-crate reference
//! implementation); [`NodeStates`] tracks per-node binding state with
//! deterministic teardown; [`Scope`] chains carry name bindings down to each
//! row; and [`ListRegion`] keeps a run of sibling nodes synchronized with a
//! reactive collection by applying array deltas (delete, add, move) to
//! the live tree without recreating retained rows.

pub mod node;
pub mod reconcile;
pub mod scope;
pub mod state;

pub use node::{ArenaTree, NodeData, NodeId, NodeKind, NodeOps};
pub use reconcile::{ListRegion, ListRegionOptions, RowBinder, RowContext};
pub use scope::{is_assignable, Direction, Evaluated, Evaluator, Scope};
pub use state::NodeStates;
