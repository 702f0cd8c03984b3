//! Edge types - Typed, directed relationships between modules
//!
//! All declared module relationships reduce to three edge kinds:
//! - `HardRequire`: source cannot load without target
//! - `SoftRequire`: source uses target when present
//! - `LoadAfter`: pure load-ordering hint
//!
//! Only `HardRequire` and `SoftRequire` *project* - participate in
//! symbol-resolution cascades. `LoadAfter` constrains load order and
//! nothing else.

use crate::id::ModuleId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Declared relationship kinds between modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Source refuses to load unless target is loaded
    HardRequire,
    /// Source uses target if loaded, loads fine without it
    SoftRequire,
    /// Source prefers to load after target; no resolution semantics
    LoadAfter,
}

impl EdgeKind {
    /// Get the string representation of the edge kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::HardRequire => "hard_require",
            EdgeKind::SoftRequire => "soft_require",
            EdgeKind::LoadAfter => "load_after",
        }
    }

    /// Get all edge kinds
    pub fn all() -> &'static [EdgeKind] {
        &[
            EdgeKind::HardRequire,
            EdgeKind::SoftRequire,
            EdgeKind::LoadAfter,
        ]
    }

    /// Whether this edge kind projects the target's scope into the source's
    /// symbol-resolution cascade.
    pub fn projects(&self) -> bool {
        matches!(self, EdgeKind::HardRequire | EdgeKind::SoftRequire)
    }
}

impl FromStr for EdgeKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hard_require" | "hard" | "require" | "requires" => Ok(EdgeKind::HardRequire),
            "soft_require" | "soft" | "optional" => Ok(EdgeKind::SoftRequire),
            "load_after" | "loadafter" | "after" => Ok(EdgeKind::LoadAfter),
            _ => Err(crate::Error::InvalidId(format!("Unknown edge kind: {}", s))),
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Handle into the graph's edge arena.
///
/// Edges are owned by the [`DependencyGraph`](crate::graph::DependencyGraph)
/// and referenced from both endpoint nodes by this id, so neither node owns
/// the edge and there are no back-pointers to manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

/// A directed relationship between two modules.
///
/// The `requirement` field is the *declared* target name from the source
/// module's manifest. `target` stays `None` until a module with that name is
/// loaded and the edge is bound to it; an unbound edge is a valid transient
/// state that validation either resolves, prunes, or reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Type of relationship
    pub kind: EdgeKind,
    /// The module that declared this relationship
    pub source: Option<ModuleId>,
    /// Declared name of the module this edge points at
    pub requirement: ModuleId,
    /// Bound endpoint; `None` while the named module is not loaded
    pub target: Option<ModuleId>,
}

impl Edge {
    /// Create a new, unregistered edge. Registration onto endpoint nodes is
    /// a separate [`DependencyGraph`](crate::graph::DependencyGraph) call.
    pub fn new(kind: EdgeKind, source: Option<ModuleId>, requirement: ModuleId) -> Self {
        Self {
            kind,
            source,
            requirement,
            target: None,
        }
    }

    /// Whether this edge is bound to a loaded target module
    pub fn is_bound(&self) -> bool {
        self.target.is_some()
    }

    /// Whether this edge participates in symbol-resolution cascades
    pub fn projects(&self) -> bool {
        self.kind.projects()
    }

    /// Identity key for set semantics: the same (kind, source, requirement)
    /// triple is counted once per node.
    pub fn key(&self) -> (EdgeKind, Option<&ModuleId>, &ModuleId) {
        (self.kind, self.source.as_ref(), &self.requirement)
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.source == other.source
            && self.requirement == other.requirement
    }
}

impl Eq for Edge {}

impl std::hash::Hash for Edge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.source.hash(state);
        self.requirement.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> ModuleId {
        ModuleId::parse(name).unwrap()
    }

    #[test]
    fn test_edge_kind_roundtrip() {
        for kind in EdgeKind::all() {
            let s = kind.as_str();
            let parsed: EdgeKind = s.parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_projecting_kinds() {
        assert!(EdgeKind::HardRequire.projects());
        assert!(EdgeKind::SoftRequire.projects());
        assert!(!EdgeKind::LoadAfter.projects());
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!(EdgeKind::from_str("requires").unwrap(), EdgeKind::HardRequire);
        assert_eq!(EdgeKind::from_str("optional").unwrap(), EdgeKind::SoftRequire);
        assert_eq!(EdgeKind::from_str("after").unwrap(), EdgeKind::LoadAfter);
        assert!(EdgeKind::from_str("sideways").is_err());
    }

    #[test]
    fn test_new_edge_is_unbound() {
        let edge = Edge::new(EdgeKind::HardRequire, Some(id("a")), id("b"));
        assert!(!edge.is_bound());
        assert!(edge.projects());
        assert_eq!(edge.requirement, id("b"));
    }

    #[test]
    fn test_edge_identity_ignores_binding() {
        let mut bound = Edge::new(EdgeKind::SoftRequire, Some(id("a")), id("b"));
        bound.target = Some(id("b"));
        let unbound = Edge::new(EdgeKind::SoftRequire, Some(id("a")), id("b"));
        assert_eq!(bound, unbound);
    }
}
