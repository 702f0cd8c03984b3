//! Resolution scope - per-module cascading symbol lookup
//!
//! Lookup order for a module:
//! 1. The module's own symbol table
//! 2. The parent scope (host-anchored chain), if any
//! 3. Each projecting outgoing edge's target, in declaration order,
//!    depth-first - restricted to the target's own table and its further
//!    projecting edges, never the target's parent scope
//!
//! A per-call visited set guarantees each module's table is consulted at
//! most once, so the cascade terminates on cyclic and repeated edges. The
//! scope borrows everything it touches and persists nothing beyond the call.

use std::collections::{HashMap, HashSet};
use crate::graph::DependencyGraph;
use crate::id::ModuleId;
use crate::symbol::SymbolTable;
use crate::{Error, Result};
use super::source::{Resolution, SymbolSource};

/// Cascading lookup for one module.
pub struct ResolutionScope<'a> {
    module: &'a ModuleId,
    graph: &'a DependencyGraph,
    tables: &'a HashMap<ModuleId, SymbolTable>,
    parent: Option<&'a dyn SymbolSource>,
}

impl<'a> ResolutionScope<'a> {
    /// Build a scope for `module` over the given graph and table map.
    pub fn new(
        module: &'a ModuleId,
        graph: &'a DependencyGraph,
        tables: &'a HashMap<ModuleId, SymbolTable>,
    ) -> Self {
        Self {
            module,
            graph,
            tables,
            parent: None,
        }
    }

    /// Attach a host-anchored parent scope, consulted after the local table.
    pub fn with_parent(mut self, parent: &'a dyn SymbolSource) -> Self {
        self.parent = Some(parent);
        self
    }

    /// The module this scope belongs to
    pub fn module(&self) -> &ModuleId {
        self.module
    }

    /// Resolve a symbol name through the cascade.
    ///
    /// A missing symbol is the `NotFound` value, never an error. `Err` is
    /// reserved for malformed graph state: a bound edge whose target node is
    /// no longer present.
    pub fn resolve(&self, name: &str) -> Result<Resolution> {
        let mut visited = HashSet::new();
        visited.insert(self.module.clone());

        if let Some(table) = self.tables.get(self.module) {
            if let Some(export) = table.lookup(name) {
                return Ok(Resolution::Found(export.clone()));
            }
        }

        // Only the initiating scope consults its parent; dependency scopes
        // below are restricted to their own tables and edges.
        if let Some(parent) = self.parent {
            if let Resolution::Found(export) = parent.resolve(name) {
                return Ok(Resolution::Found(export));
            }
        }

        self.resolve_dependencies(self.module, name, &mut visited)
    }

    fn resolve_dependencies(
        &self,
        module: &ModuleId,
        name: &str,
        visited: &mut HashSet<ModuleId>,
    ) -> Result<Resolution> {
        let node = self
            .graph
            .node(module)
            .ok_or_else(|| Error::UnknownModule(module.clone()))?;

        for eid in node.outgoing() {
            let Some(edge) = self.graph.edge(*eid) else {
                continue;
            };
            if !edge.projects() {
                continue;
            }
            let Some(target) = &edge.target else {
                // Declared but unresolved; validation will prune or report it.
                continue;
            };
            if !self.graph.contains(target) {
                return Err(Error::GraphIntegrity(format!(
                    "edge from '{}' is bound to unloaded module '{}'",
                    module, target
                )));
            }
            if visited.contains(target) {
                continue;
            }
            visited.insert(target.clone());

            if let Some(table) = self.tables.get(target) {
                if let Some(export) = table.lookup(name) {
                    return Ok(Resolution::Found(export.clone()));
                }
            }
            if let Resolution::Found(export) =
                self.resolve_dependencies(target, name, visited)?
            {
                return Ok(Resolution::Found(export));
            }
        }
        Ok(Resolution::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeKind;
    use crate::resolve::source::TableSource;
    use crate::symbol::{Export, ExportKind};

    fn id(name: &str) -> ModuleId {
        ModuleId::parse(name).unwrap()
    }

    struct Fixture {
        graph: DependencyGraph,
        tables: HashMap<ModuleId, SymbolTable>,
    }

    impl Fixture {
        fn new(names: &[&str]) -> Self {
            let mut graph = DependencyGraph::new();
            let mut tables = HashMap::new();
            for name in names {
                graph.add_node(id(name)).unwrap();
                tables.insert(id(name), SymbolTable::new());
            }
            Self { graph, tables }
        }

        fn define(&mut self, module: &str, symbol: &str) {
            self.tables
                .get_mut(&id(module))
                .unwrap()
                .define(Export::new(symbol, id(module), ExportKind::Service));
        }

        fn edge(&mut self, kind: EdgeKind, from: &str, to: &str) {
            self.graph.add_edge(kind, &id(from), id(to)).unwrap();
        }

        fn resolve(&self, module: &str, symbol: &str) -> Resolution {
            let module = id(module);
            ResolutionScope::new(&module, &self.graph, &self.tables)
                .resolve(symbol)
                .unwrap()
        }
    }

    #[test]
    fn test_local_table_wins() {
        let mut fx = Fixture::new(&["a", "b"]);
        fx.define("a", "greet");
        fx.define("b", "greet");
        fx.edge(EdgeKind::HardRequire, "a", "b");

        let hit = fx.resolve("a", "greet");
        assert_eq!(hit.found().unwrap().provider, id("a"));
    }

    #[test]
    fn test_parent_scope_before_dependencies() {
        let mut fx = Fixture::new(&["a", "b"]);
        fx.define("b", "registry");
        fx.edge(EdgeKind::HardRequire, "a", "b");

        let mut host = SymbolTable::new();
        host.define(Export::new("registry", id("host"), ExportKind::Service));
        let host_source = TableSource::new(&host);

        let module = id("a");
        let scope = ResolutionScope::new(&module, &fx.graph, &fx.tables)
            .with_parent(&host_source);
        let hit = scope.resolve("registry").unwrap();
        assert_eq!(hit.found().unwrap().provider, id("host"));
    }

    #[test]
    fn test_dependency_order_first_match_wins() {
        let mut fx = Fixture::new(&["a", "b", "c"]);
        fx.define("b", "y");
        fx.define("c", "y");
        // Declared b first, then c.
        fx.edge(EdgeKind::HardRequire, "a", "b");
        fx.edge(EdgeKind::HardRequire, "a", "c");

        let hit = fx.resolve("a", "y");
        assert_eq!(hit.found().unwrap().provider, id("b"));
    }

    #[test]
    fn test_cascade_is_depth_first() {
        let mut fx = Fixture::new(&["a", "b", "c", "d"]);
        fx.define("d", "deep");
        fx.define("c", "deep");
        fx.edge(EdgeKind::HardRequire, "a", "b");
        fx.edge(EdgeKind::HardRequire, "a", "c");
        fx.edge(EdgeKind::HardRequire, "b", "d");

        // b's subtree (including d) is exhausted before c is consulted.
        let hit = fx.resolve("a", "deep");
        assert_eq!(hit.found().unwrap().provider, id("d"));
    }

    #[test]
    fn test_load_after_does_not_project() {
        let mut fx = Fixture::new(&["a", "b"]);
        fx.define("b", "hidden");
        fx.edge(EdgeKind::LoadAfter, "a", "b");

        assert_eq!(fx.resolve("a", "hidden"), Resolution::NotFound);
    }

    #[test]
    fn test_soft_require_projects_like_hard() {
        let mut fx = Fixture::new(&["a", "b"]);
        fx.define("b", "extras");
        fx.edge(EdgeKind::SoftRequire, "a", "b");

        assert!(fx.resolve("a", "extras").is_found());
    }

    #[test]
    fn test_cycle_terminates_not_found() {
        let mut fx = Fixture::new(&["a", "b"]);
        fx.edge(EdgeKind::HardRequire, "a", "b");
        fx.edge(EdgeKind::HardRequire, "b", "a");

        assert_eq!(fx.resolve("a", "x"), Resolution::NotFound);
    }

    #[test]
    fn test_cycle_still_resolves_through_back_edge() {
        let mut fx = Fixture::new(&["a", "b", "c"]);
        fx.define("c", "shared");
        fx.edge(EdgeKind::HardRequire, "a", "b");
        fx.edge(EdgeKind::HardRequire, "b", "a");
        fx.edge(EdgeKind::HardRequire, "b", "c");

        let hit = fx.resolve("a", "shared");
        assert_eq!(hit.found().unwrap().provider, id("c"));
    }

    #[test]
    fn test_unresolved_edge_is_skipped() {
        let mut fx = Fixture::new(&["a"]);
        fx.graph
            .add_edge(EdgeKind::HardRequire, &id("a"), id("ghost"))
            .unwrap();

        assert_eq!(fx.resolve("a", "anything"), Resolution::NotFound);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let mut fx = Fixture::new(&["a", "b", "c"]);
        fx.define("b", "y");
        fx.define("c", "y");
        fx.edge(EdgeKind::SoftRequire, "a", "b");
        fx.edge(EdgeKind::HardRequire, "a", "c");

        let first = fx.resolve("a", "y");
        let second = fx.resolve("a", "y");
        assert_eq!(first, second);
        assert_eq!(first.found().unwrap().provider, id("b"));
    }
}
