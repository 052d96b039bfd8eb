//! Scope Chains and Expression Evaluation
//!
//! Bindings resolve expressions against a lexical chain of scopes: each
//! reconciled row gets a child scope that shadows its parent with the row's
//! item (and index, when tracked). Evaluation itself is a collaborator
//! concern behind the [`Evaluator`] trait; the core only defines the value
//! shapes an evaluator may hand back and the syntactic write-back rule.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::Error;
use crate::reactive::Cell;

/// One frame in a lexical scope chain.
///
/// Lookup walks outward through parent frames; inner bindings shadow outer
/// ones. Frames are shared through `Arc` so rows can extend a common parent
/// without copying it.
#[derive(Debug)]
pub struct Scope<T> {
    parent: Option<Arc<Scope<T>>>,
    bindings: RwLock<HashMap<String, T>>,
}

impl<T: Clone> Scope<T> {
    /// Create a root scope with no parent.
    pub fn root() -> Arc<Self> {
        Arc::new(Self {
            parent: None,
            bindings: RwLock::new(HashMap::new()),
        })
    }

    /// Create a child scope extending `self`.
    pub fn child(self: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(Arc::clone(self)),
            bindings: RwLock::new(HashMap::new()),
        })
    }

    /// Bind `name` in this frame, shadowing any outer binding.
    pub fn insert(&self, name: impl Into<String>, value: T) {
        self.bindings
            .write()
            .expect("scope lock poisoned")
            .insert(name.into(), value);
    }

    /// Resolve `name`, walking outward through parent frames.
    pub fn lookup(&self, name: &str) -> Option<T> {
        if let Some(value) = self
            .bindings
            .read()
            .expect("scope lock poisoned")
            .get(name)
        {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Number of frames from here to the root, root counting as 1.
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.depth())
    }
}

/// Data-flow direction of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Model to node: the binding reads a stream.
    Out,
    /// Node to model: the binding writes through a sink.
    In,
    /// Both directions.
    InOut,
}

impl Direction {
    pub fn reads(&self) -> bool {
        matches!(self, Direction::Out | Direction::InOut)
    }

    pub fn writes(&self) -> bool {
        matches!(self, Direction::In | Direction::InOut)
    }
}

/// What an evaluator hands back for one expression.
pub enum Evaluated<T: Clone + Send + Sync + 'static> {
    /// A fixed value; the binding never updates.
    Constant(T),
    /// A reactive stream of values.
    Stream(Cell<T>),
    /// A write-back sink.
    Sink(Arc<dyn Fn(T) + Send + Sync>),
    /// A stream and a sink for the same expression.
    Both(Cell<T>, Arc<dyn Fn(T) + Send + Sync>),
}

impl<T: Clone + Send + Sync + 'static> std::fmt::Debug for Evaluated<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Evaluated::Constant(_) => "Constant",
            Evaluated::Stream(_) => "Stream",
            Evaluated::Sink(_) => "Sink",
            Evaluated::Both(..) => "Both",
        };
        f.debug_tuple(name).finish()
    }
}

/// Expression-evaluation collaborator contract.
///
/// Implementations resolve `expr` against `scope` and return the richest
/// shape they can for the requested direction. When the direction writes and
/// the expression is a plain value, a sink may be synthesized only for
/// expressions [`is_assignable`] accepts; non-assignable writes are silently
/// dropped by conforming evaluators.
pub trait Evaluator<T: Clone + Send + Sync + 'static>: Send + Sync {
    fn evaluate(
        &self,
        scope: &Arc<Scope<T>>,
        expr: &str,
        direction: Direction,
    ) -> Result<Evaluated<T>, Error>;
}

/// Whether `expr` is a syntactically assignable path: a bare identifier or a
/// chain of property/index accesses off one (`count`, `user.name`,
/// `rows[0].label`). Anything else (literals, calls, arithmetic) is not a
/// write target.
pub fn is_assignable(expr: &str) -> bool {
    let mut chars = expr.trim().chars().peekable();

    fn eat_identifier(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> bool {
        match chars.peek() {
            Some(c) if c.is_ascii_alphabetic() || *c == '_' || *c == '$' => {
                chars.next();
            }
            _ => return false,
        }
        while let Some(c) = chars.peek() {
            if c.is_ascii_alphanumeric() || *c == '_' || *c == '$' {
                chars.next();
            } else {
                break;
            }
        }
        true
    }

    if !eat_identifier(&mut chars) {
        return false;
    }
    loop {
        match chars.next() {
            None => return true,
            Some('.') => {
                if !eat_identifier(&mut chars) {
                    return false;
                }
            }
            Some('[') => {
                let mut digits = 0;
                while let Some(c) = chars.peek() {
                    if c.is_ascii_digit() {
                        chars.next();
                        digits += 1;
                    } else {
                        break;
                    }
                }
                if digits == 0 || chars.next() != Some(']') {
                    return false;
                }
            }
            Some(_) => return false,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
