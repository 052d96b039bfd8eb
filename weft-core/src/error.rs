//! Error Types and the Exception Sink
//!
//! Weft distinguishes two failure channels:
//!
//! - **Argument errors** are returned synchronously as `Result` values from
//!   the mutation that received the bad input.
//!
//! - **Evaluation and structural errors** are routed to a single
//!   process-wide exception sink. A failing row binding or a conflicting
//!   descendant claim aborts only the offending setup; sibling bindings keep
//!   working. Recovery policy belongs to the layer that installs the sink.
//!
//! The default sink logs through `tracing::error!`.

use std::sync::{OnceLock, RwLock};

/// Errors produced by the reactive core and the tree layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A mutation received a disallowed input (e.g. an empty item list).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An expression failed to evaluate against its scope.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// Two binding handlers both demanded exclusive control of one node's
    /// descendants.
    #[error("descendants of node {node} are already controlled by another binding")]
    DescendantsClaimed {
        /// Raw id of the contested node.
        node: u64,
    },

    /// An observer callback panicked during delivery. The panic is caught so
    /// the remaining observers still receive the notification.
    #[error("observer panicked during delivery: {0}")]
    ObserverPanic(String),
}

type SinkFn = dyn Fn(&Error) + Send + Sync;

// Global exception sink. Installed once per process, replaceable.
static SINK: OnceLock<RwLock<Option<Box<SinkFn>>>> = OnceLock::new();

fn sink() -> &'static RwLock<Option<Box<SinkFn>>> {
    SINK.get_or_init(|| RwLock::new(None))
}

/// Install a process-wide exception sink.
///
/// All evaluation and structural errors are routed here. Replaces any
/// previously installed sink.
pub fn set_exception_sink<F>(handler: F)
where
    F: Fn(&Error) + Send + Sync + 'static,
{
    *sink().write().expect("exception sink lock poisoned") = Some(Box::new(handler));
}

/// Remove the installed sink, restoring the default logging behavior.
pub fn clear_exception_sink() {
    *sink().write().expect("exception sink lock poisoned") = None;
}

/// Route an error to the exception sink.
///
/// With no sink installed, the error is logged and otherwise swallowed so
/// that one failing binding cannot abort its siblings.
pub fn report(err: &Error) {
    let guard = sink().read().expect("exception sink lock poisoned");
    match guard.as_ref() {
        Some(handler) => handler(err),
        None => tracing::error!(error = %err, "unhandled reactive error"),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
