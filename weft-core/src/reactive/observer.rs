//! Observer and Subscription Types
//!
//! An `Observer` is the registered endpoint of a cell subscription: a
//! next/error/complete callback triple plus an active flag. A
//! `Subscription` is the disposer handed back by `subscribe`.
//!
//! Disposal rules:
//!
//! - `unsubscribe` is idempotent.
//! - Flipping the active flag suppresses delivery of notifications still in
//!   flight from the very `next()` call during which the observer
//!   unsubscribed itself (the delivery loop re-checks the flag per call).
//! - Dropping a `Subscription` without calling `unsubscribe` leaves the
//!   observer attached.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::Error;

/// Unique identifier for an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered observer: callback triple plus delivery state.
pub(crate) struct Observer<T> {
    id: ObserverId,
    on_next: Box<dyn Fn(&T) + Send + Sync>,
    on_error: Option<Box<dyn Fn(&Error) + Send + Sync>>,
    on_complete: Option<Box<dyn Fn() + Send + Sync>>,
    active: AtomicBool,
}

impl<T> Observer<T> {
    pub(crate) fn new(
        on_next: Box<dyn Fn(&T) + Send + Sync>,
        on_error: Option<Box<dyn Fn(&Error) + Send + Sync>>,
        on_complete: Option<Box<dyn Fn() + Send + Sync>>,
    ) -> Self {
        Self {
            id: ObserverId::new(),
            on_next,
            on_error,
            on_complete,
            active: AtomicBool::new(true),
        }
    }

    pub(crate) fn id(&self) -> ObserverId {
        self.id
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub(crate) fn next(&self, value: &T) {
        (self.on_next)(value);
    }

    pub(crate) fn error(&self, err: &Error) {
        if let Some(on_error) = &self.on_error {
            on_error(err);
        }
    }

    pub(crate) fn complete(&self) {
        if let Some(on_complete) = &self.on_complete {
            on_complete();
        }
    }
}

/// Disposer returned by `subscribe`.
pub struct Subscription {
    detach: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub(crate) fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Mutex::new(Some(Box::new(detach))),
        }
    }

    /// A subscription that was never attached (e.g. subscribing to an
    /// already-terminated cell).
    pub(crate) fn inert() -> Self {
        Self {
            detach: Mutex::new(None),
        }
    }

    /// Detach the observer. Idempotent; later calls are no-ops.
    pub fn unsubscribe(&self) {
        let detach = self
            .detach
            .lock()
            .expect("subscription lock poisoned")
            .take();
        if let Some(detach) = detach {
            detach();
        }
    }

    /// Whether `unsubscribe` has already run.
    pub fn is_disposed(&self) -> bool {
        self.detach
            .lock()
            .expect("subscription lock poisoned")
            .is_none()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
