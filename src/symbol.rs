//! Export types - What a module publishes into its local symbol table
//!
//! Modules expose named entry points to the modules that depend on them.
//! The graph core treats table contents as opaque; the kinds here exist so
//! hosts and tooling can categorize what they resolved:
//! - `Service`: a long-lived object other modules call into
//! - `Command`: a host command handler
//! - `Hook`: an event/listener registration point
//! - `Value`: plain data (constants, shared settings)

use crate::{Error, Result};
use crate::id::ModuleId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Categories of exported symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    /// Long-lived object other modules call into
    Service,
    /// Host command handler
    Command,
    /// Event/listener registration point
    Hook,
    /// Plain data
    Value,
}

impl ExportKind {
    /// Get the string representation of the export kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Service => "service",
            ExportKind::Command => "command",
            ExportKind::Hook => "hook",
            ExportKind::Value => "value",
        }
    }

    /// Get all export kinds
    pub fn all() -> &'static [ExportKind] {
        &[
            ExportKind::Service,
            ExportKind::Command,
            ExportKind::Hook,
            ExportKind::Value,
        ]
    }
}

impl FromStr for ExportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "service" | "api" | "provider" => Ok(ExportKind::Service),
            "command" | "cmd" => Ok(ExportKind::Command),
            "hook" | "event" | "listener" => Ok(ExportKind::Hook),
            "value" | "const" | "data" => Ok(ExportKind::Value),
            _ => Err(Error::InvalidId(format!("Unknown export kind: {}", s))),
        }
    }
}

impl std::fmt::Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named symbol a module publishes.
///
/// Carries its provider so a resolution result always identifies *which*
/// module satisfied the lookup, not just that something did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    /// Symbol name, unique within the providing module's table
    pub name: String,
    /// The module that defines this symbol
    pub provider: ModuleId,
    /// Category of the exported symbol
    pub kind: ExportKind,
}

impl Export {
    /// Create a new export
    pub fn new(name: impl Into<String>, provider: ModuleId, kind: ExportKind) -> Self {
        Self {
            name: name.into(),
            provider,
            kind,
        }
    }
}

impl PartialEq for Export {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.provider == other.provider
    }
}

impl Eq for Export {}

/// A module's local symbol table.
///
/// Owned by the module (via the host), consulted first during resolution.
/// Lookup is by exact name; the cascade over dependencies is the
/// [`ResolutionScope`](crate::resolve::ResolutionScope)'s job, not the
/// table's.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    exports: HashMap<String, Export>,
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Define an export, replacing any previous symbol of the same name
    pub fn define(&mut self, export: Export) {
        self.exports.insert(export.name.clone(), export);
    }

    /// Look up a symbol by exact name
    pub fn lookup(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    /// Number of exports in the table
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    /// Whether the table has no exports
    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    /// Iterate all exports
    pub fn iter(&self) -> impl Iterator<Item = &Export> {
        self.exports.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> ModuleId {
        ModuleId::parse(name).unwrap()
    }

    #[test]
    fn test_export_kind_roundtrip() {
        for kind in ExportKind::all() {
            let s = kind.as_str();
            let parsed: ExportKind = s.parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_export_kind_aliases() {
        assert_eq!(ExportKind::from_str("api").unwrap(), ExportKind::Service);
        assert_eq!(ExportKind::from_str("cmd").unwrap(), ExportKind::Command);
        assert_eq!(ExportKind::from_str("event").unwrap(), ExportKind::Hook);
        assert_eq!(ExportKind::from_str("const").unwrap(), ExportKind::Value);
    }

    #[test]
    fn test_table_define_and_lookup() {
        let mut table = SymbolTable::new();
        table.define(Export::new("economy", id("economy-core"), ExportKind::Service));

        let found = table.lookup("economy").unwrap();
        assert_eq!(found.provider, id("economy-core"));
        assert!(table.lookup("missing").is_none());
    }

    #[test]
    fn test_table_redefine_replaces() {
        let mut table = SymbolTable::new();
        table.define(Export::new("greet", id("a"), ExportKind::Command));
        table.define(Export::new("greet", id("a"), ExportKind::Service));

        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("greet").unwrap().kind, ExportKind::Service);
    }
}
