//! Name resolution for running chunks.
//!
//! The VM only ever asks two questions of its surroundings: what value an
//! identifier holds, and what a function name refers to. [`Resolver`] is
//! that boundary; [`Environment`] is a ready-made implementation for hosts
//! without a world model of their own.

use std::collections::HashMap;
use std::sync::Arc;

use kokiri_types::Packed;

use crate::function::Function;

/// The capability a chunk is evaluated against.
pub trait Resolver {
    fn identifier(&self, name: &str) -> Option<Packed>;
    fn function(&self, name: &str) -> FunctionRef;
}

/// Outcome of a function lookup.
#[derive(Debug, Clone)]
pub enum FunctionRef {
    Bound(Function),
    /// The name is reserved but nothing is bound to it yet.
    Declared,
    Unbound,
}

/// Identifier bindings, optionally chained to a parent scope.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: HashMap<String, Packed>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope whose misses fall through to `parent`.
    pub fn with_parent(parent: Arc<Scope>) -> Self {
        Self {
            bindings: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Bind `name` in this scope, shadowing any parent binding.
    pub fn set(&mut self, name: impl Into<String>, value: Packed) {
        self.bindings.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Packed> {
        self.bindings.remove(name)
    }

    /// Look up from this scope outward.
    pub fn get(&self, name: &str) -> Option<Packed> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(&value) = current.bindings.get(name) {
                return Some(value);
            }
            scope = current.parent.as_deref();
        }
        None
    }
}

/// Function namespace. Names may be declared ahead of their definition.
#[derive(Debug, Clone, Default)]
pub struct Functions {
    entries: HashMap<String, Option<Function>>,
}

impl Functions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `name` without binding it. An existing definition is kept.
    pub fn declare(&mut self, name: impl Into<String>) {
        self.entries.entry(name.into()).or_insert(None);
    }

    pub fn define(&mut self, function: Function) {
        self.entries
            .insert(function.name().to_owned(), Some(function));
    }

    pub fn get(&self, name: &str) -> FunctionRef {
        match self.entries.get(name) {
            Some(Some(function)) => FunctionRef::Bound(function.clone()),
            Some(None) => FunctionRef::Declared,
            None => FunctionRef::Unbound,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A global scope plus a function namespace.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub scope: Scope,
    pub functions: Functions,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Packed>) {
        self.scope.set(name, value.into());
    }

    pub fn define_native<F>(&mut self, name: impl Into<String>, arity: usize, call: F)
    where
        F: Fn(&[Packed]) -> Result<Packed, String> + Send + Sync + 'static,
    {
        self.functions.define(Function::native(name, arity, call));
    }
}

impl Resolver for Environment {
    fn identifier(&self, name: &str) -> Option<Packed> {
        self.scope.get(name)
    }

    fn function(&self, name: &str) -> FunctionRef {
        self.functions.get(name)
    }
}

/// Resolver for the body of a compiled function: parameters over the
/// captured scope, functions from the caller.
pub(crate) struct Frame<'a> {
    pub(crate) locals: Scope,
    pub(crate) outer: &'a dyn Resolver,
}

impl Resolver for Frame<'_> {
    fn identifier(&self, name: &str) -> Option<Packed> {
        self.locals.get(name)
    }

    fn function(&self, name: &str) -> FunctionRef {
        self.outer.function(name)
    }
}
