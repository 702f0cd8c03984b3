//! Symbol resolution - cascading lookup over the dependency graph
//!
//! - `source`: the [`SymbolSource`] abstraction and its concrete variants
//! - `scope`: per-module [`ResolutionScope`] implementing the cascade

pub mod scope;
pub mod source;

pub use scope::ResolutionScope;
pub use source::{ChainSource, Resolution, SymbolSource, TableSource};
