//! Compile-time symbol table.
//!
//! The table decides how a name is lowered. Names it does not know are
//! emitted as plain identifier loads or runtime calls.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use kokiri_types::ast::Expr;
use kokiri_types::Span;

/// Rewrite behind a compiler intrinsic.
///
/// Receives the call's already rewritten arguments and the call's span.
/// Returns the replacement tree, or a message explaining the rejection.
pub type Intrinsic = Arc<dyn Fn(Vec<Expr>, Span) -> Result<Expr, String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// A value looked up at run time.
    Identifier,
    /// A runtime function. A bare reference to it is a zero-argument call.
    Function,
    /// Rewritten away at compile time.
    CompilerIntrinsic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolState {
    Declared,
    Defined,
}

#[derive(Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub state: SymbolState,
    /// Declaration order.
    pub index: usize,
    intrinsic: Option<Intrinsic>,
}

impl Symbol {
    /// The rewrite, for a defined intrinsic.
    pub fn intrinsic(&self) -> Option<&Intrinsic> {
        self.intrinsic.as_ref()
    }

    pub fn is_defined(&self) -> bool {
        self.state == SymbolState::Defined
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbol")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: IndexMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `name`. Declaring a name that already exists leaves the
    /// existing entry untouched, so a definition is never downgraded.
    pub fn declare(&mut self, name: impl Into<String>, kind: SymbolKind) -> &Symbol {
        let name = name.into();
        let index = self.symbols.len();
        self.symbols.entry(name.clone()).or_insert_with(|| Symbol {
            name,
            kind,
            state: SymbolState::Declared,
            index,
            intrinsic: None,
        })
    }

    /// Define a runtime identifier or function.
    pub fn define(&mut self, name: impl Into<String>, kind: SymbolKind) -> &Symbol {
        self.upsert(name.into(), kind, None)
    }

    /// Define a compiler intrinsic with its rewrite.
    pub fn define_intrinsic<F>(&mut self, name: impl Into<String>, rewrite: F) -> &Symbol
    where
        F: Fn(Vec<Expr>, Span) -> Result<Expr, String> + Send + Sync + 'static,
    {
        self.upsert(
            name.into(),
            SymbolKind::CompilerIntrinsic,
            Some(Arc::new(rewrite)),
        )
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Symbols in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn upsert(&mut self, name: String, kind: SymbolKind, intrinsic: Option<Intrinsic>) -> &Symbol {
        let index = self.symbols.len();
        let symbol = self.symbols.entry(name.clone()).or_insert_with(|| Symbol {
            name,
            kind,
            state: SymbolState::Declared,
            index,
            intrinsic: None,
        });
        symbol.kind = kind;
        symbol.state = SymbolState::Defined;
        symbol.intrinsic = intrinsic;
        symbol
    }
}
