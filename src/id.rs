//! Module identity - Stable name-based identifier for every loaded module
//!
//! A module's id is its declared name, unique across the host for the
//! lifetime of the module's graph node. Dependency declarations reference
//! other modules by this name, which is how an edge can exist before its
//! target has been loaded.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique, stable identifier for a module.
///
/// Serves as the primary key for:
/// - Graph nodes
/// - Edge endpoints and declared requirements
/// - Symbol tables and export providers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    /// Parse and validate a module id.
    ///
    /// Ids must be non-empty and free of whitespace and path separators,
    /// since they double as data-directory names.
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidId("module id cannot be empty".to_string()));
        }
        if name.chars().any(|c| c.is_whitespace()) {
            return Err(Error::InvalidId(format!(
                "module id '{}' contains whitespace",
                name
            )));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(Error::InvalidId(format!(
                "module id '{}' contains a path separator",
                name
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// The module name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ModuleId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ModuleId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ModuleId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ModuleId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_id() {
        let id = ModuleId::parse("world-gen").unwrap();
        assert_eq!(id.as_str(), "world-gen");
        assert_eq!(id.to_string(), "world-gen");
    }

    #[test]
    fn test_invalid_ids() {
        assert!(ModuleId::parse("").is_err());
        assert!(ModuleId::parse("has space").is_err());
        assert!(ModuleId::parse("has\ttab").is_err());
        assert!(ModuleId::parse("path/like").is_err());
        assert!(ModuleId::parse("path\\like").is_err());
    }

    #[test]
    fn test_from_str_roundtrip() {
        let id: ModuleId = "economy.core".parse().unwrap();
        let again: ModuleId = id.to_string().parse().unwrap();
        assert_eq!(id, again);
    }
}
