//! Weft Core
//!
//! This crate provides the reactive state layer for the Weft UI toolkit.
//! It implements:
//!
//! - Reactive primitives (cells, computed values, collections)
//! - Array diffing with move detection
//! - Incremental list reconciliation against a host node tree
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Cells, computed values, collections, and combinators
//! - `list`: The array diff engine producing delete/add/move scripts
//! - `tree`: Node-tree collaborators, scopes, and the list reconciler
//! - `error`: The crate error type and the process-wide exception sink
//!
//! # Example
//!
//! ```rust
//! use weft_core::reactive::{Cell, Computed};
//!
//! // Create a cell
//! let count = Cell::new(0);
//!
//! // Create a derived value
//! let doubled = Computed::new(&count, 0, |n| n * 2);
//!
//! // Subscribe; the current value is replayed immediately
//! let sub = doubled.subscribe(|n| {
//!     println!("Doubled: {n}");
//! });
//!
//! // Push an update; the subscriber runs synchronously
//! count.next(5);
//! sub.unsubscribe();
//! ```

pub mod error;
pub mod list;
pub mod reactive;
pub mod tree;

pub use error::{clear_exception_sink, set_exception_sink, Error};
