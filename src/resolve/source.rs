//! Symbol sources - the pluggable ends of a resolution cascade
//!
//! A `SymbolSource` is anything that can answer "do you define this name":
//! a module's local table, or a host-anchored chain of fallback sources.
//! The cascade in [`scope`](super::scope) composes these with graph
//! traversal.

use crate::symbol::{Export, SymbolTable};

/// Outcome of a symbol lookup.
///
/// `NotFound` is a normal negative result, not a failure: callers branch on
/// it, they never unwrap it away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The symbol was found; first match in cascade order wins
    Found(Export),
    /// No source in the cascade defines the symbol
    NotFound,
}

impl Resolution {
    /// Whether the lookup succeeded
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    /// The resolved export, if any
    pub fn found(&self) -> Option<&Export> {
        match self {
            Resolution::Found(export) => Some(export),
            Resolution::NotFound => None,
        }
    }
}

/// Anything that can resolve a symbol name.
pub trait SymbolSource {
    /// Look up `name`, returning the first match or `NotFound`
    fn resolve(&self, name: &str) -> Resolution;
}

/// A source backed by a single module-local symbol table.
pub struct TableSource<'a> {
    table: &'a SymbolTable,
}

impl<'a> TableSource<'a> {
    /// Wrap a table as a source
    pub fn new(table: &'a SymbolTable) -> Self {
        Self { table }
    }
}

impl SymbolSource for TableSource<'_> {
    fn resolve(&self, name: &str) -> Resolution {
        match self.table.lookup(name) {
            Some(export) => Resolution::Found(export.clone()),
            None => Resolution::NotFound,
        }
    }
}

/// A source delegating to several others in order.
///
/// This is the host-anchored parent chain: it is consulted after a module's
/// own table and never recurses back into the asking module's dependencies.
pub struct ChainSource<'a> {
    sources: Vec<&'a dyn SymbolSource>,
}

impl<'a> ChainSource<'a> {
    /// Build an empty chain
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    /// Append a source; earlier sources win
    pub fn push(mut self, source: &'a dyn SymbolSource) -> Self {
        self.sources.push(source);
        self
    }
}

impl Default for ChainSource<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolSource for ChainSource<'_> {
    fn resolve(&self, name: &str) -> Resolution {
        for source in &self.sources {
            if let Resolution::Found(export) = source.resolve(name) {
                return Resolution::Found(export);
            }
        }
        Resolution::NotFound
    }
}
