//! Dependency Graph - Live graph of loaded modules and their declared edges
//!
//! The graph is the arena: it owns every [`ModuleNode`] by id and every
//! [`Edge`] by [`EdgeId`]. Nodes reference their edges by handle in both
//! directions (outgoing and incoming), so removal always detaches from both
//! endpoints and no back-pointers exist to dangle.
//!
//! Edge lists are insertion-ordered and deduplicated. Order matters: it is
//! the declaration order from the module's manifest, and it is reused as the
//! symbol-resolution cascade order.

use std::collections::{HashMap, HashSet, VecDeque};
use crate::edge::{Edge, EdgeId, EdgeKind};
use crate::id::ModuleId;
use crate::{Error, Result};

/// One loaded module's graph-facing state.
///
/// Holds edge handles only; the edges themselves live in the graph's arena.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    id: ModuleId,
    outgoing: Vec<EdgeId>,
    incoming: Vec<EdgeId>,
}

impl ModuleNode {
    fn new(id: ModuleId) -> Self {
        Self {
            id,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// The module this node represents
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Edges declared by this module, in declaration order
    pub fn outgoing(&self) -> &[EdgeId] {
        &self.outgoing
    }

    /// Edges declared by other modules that bind to this one
    pub fn incoming(&self) -> &[EdgeId] {
        &self.incoming
    }
}

/// Result of validating a module's declared requirements.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum Validation {
    /// Every hard requirement is satisfied; missing soft requirements were pruned
    Ok,
    /// These hard requirements are not loaded; the edges are retained for diagnostics
    Unsatisfied(Vec<ModuleId>),
}

impl Validation {
    /// Whether validation passed
    pub fn is_ok(&self) -> bool {
        matches!(self, Validation::Ok)
    }
}

/// The live dependency graph over all loaded modules.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// All nodes indexed by module id
    nodes: HashMap<ModuleId, ModuleNode>,
    /// Node registration order, for deterministic iteration and tie-breaks
    order: Vec<ModuleId>,
    /// Edge arena
    edges: HashMap<EdgeId, Edge>,
    /// Next edge handle to assign
    next_edge: u32,
}

impl DependencyGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, empty node for a module
    pub fn add_node(&mut self, id: ModuleId) -> Result<()> {
        if self.nodes.contains_key(&id) {
            return Err(Error::AlreadyPresent(id));
        }
        self.order.push(id.clone());
        self.nodes.insert(id.clone(), ModuleNode::new(id));
        Ok(())
    }

    /// Whether a module is currently loaded
    pub fn contains(&self, id: &ModuleId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get a module's node
    pub fn node(&self, id: &ModuleId) -> Option<&ModuleNode> {
        self.nodes.get(id)
    }

    /// All loaded module ids, in registration order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleId> {
        self.order.iter()
    }

    /// Number of loaded modules
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get an edge by handle
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// All edges in the arena
    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// A module's declared edges, in declaration order
    pub fn edges_from(&self, id: &ModuleId) -> Vec<&Edge> {
        self.nodes
            .get(id)
            .map(|n| n.outgoing.iter().filter_map(|e| self.edges.get(e)).collect())
            .unwrap_or_default()
    }

    /// Edges bound to a module from its dependents, in binding order
    pub fn edges_to(&self, id: &ModuleId) -> Vec<&Edge> {
        self.nodes
            .get(id)
            .map(|n| n.incoming.iter().filter_map(|e| self.edges.get(e)).collect())
            .unwrap_or_default()
    }

    /// Declare an edge from `source` to the module named `requirement`.
    ///
    /// Registers the edge on the source's outgoing list and, when a module
    /// with the required name is already loaded, binds it and registers it on
    /// that module's incoming list. An unbound edge is a valid transient
    /// state resolved later by [`bind_pending`](Self::bind_pending) or
    /// reported by [`validate`](Self::validate).
    ///
    /// Relationships are a set: declaring the same (kind, requirement) twice
    /// from one module returns the existing handle.
    pub fn add_edge(
        &mut self,
        kind: EdgeKind,
        source: &ModuleId,
        requirement: ModuleId,
    ) -> Result<EdgeId> {
        if !self.nodes.contains_key(source) {
            return Err(Error::UnknownModule(source.clone()));
        }
        if *source == requirement {
            return Err(Error::GraphIntegrity(format!(
                "module '{}' cannot depend on itself",
                source
            )));
        }
        // Set semantics: same (kind, source, requirement) counted once.
        if let Some(node) = self.nodes.get(source) {
            for eid in &node.outgoing {
                if let Some(edge) = self.edges.get(eid) {
                    if edge.kind == kind && edge.requirement == requirement {
                        return Ok(*eid);
                    }
                }
            }
        }

        let eid = EdgeId(self.next_edge);
        self.next_edge += 1;
        let mut edge = Edge::new(kind, Some(source.clone()), requirement);

        if self.nodes.contains_key(&edge.requirement) {
            edge.target = Some(edge.requirement.clone());
        }
        let target = edge.target.clone();
        self.edges.insert(eid, edge);

        if let Some(node) = self.nodes.get_mut(source) {
            node.outgoing.push(eid);
        }
        if let Some(t) = target {
            if let Some(node) = self.nodes.get_mut(&t) {
                node.incoming.push(eid);
            }
        }
        Ok(eid)
    }

    /// Remove an edge, detaching it from both endpoints.
    ///
    /// Idempotent: removing an already-removed handle is a no-op. Callers
    /// iterating a node's edge list must snapshot it before removing.
    pub fn remove_edge(&mut self, id: EdgeId) {
        let Some(edge) = self.edges.remove(&id) else {
            return;
        };
        if let Some(source) = &edge.source {
            if let Some(node) = self.nodes.get_mut(source) {
                node.outgoing.retain(|e| *e != id);
            }
        }
        if let Some(target) = &edge.target {
            if let Some(node) = self.nodes.get_mut(target) {
                node.incoming.retain(|e| *e != id);
            }
        }
    }

    /// Bind an unresolved edge to a now-loaded module.
    ///
    /// The new target must be loaded and must carry the name the edge
    /// declared. If the edge was bound elsewhere it is detached first and
    /// re-registered on the new endpoint.
    pub fn rebind_target(&mut self, id: EdgeId, new_target: &ModuleId) -> Result<()> {
        let edge = self
            .edges
            .get(&id)
            .ok_or_else(|| Error::GraphIntegrity(format!("no such edge: {:?}", id)))?;
        if edge.requirement != *new_target {
            return Err(Error::GraphIntegrity(format!(
                "edge requires '{}', cannot bind to '{}'",
                edge.requirement, new_target
            )));
        }
        if !self.nodes.contains_key(new_target) {
            return Err(Error::UnknownModule(new_target.clone()));
        }
        let old_target = edge.target.clone();
        if let Some(old) = &old_target {
            if old == new_target {
                return Ok(());
            }
            if let Some(node) = self.nodes.get_mut(old) {
                node.incoming.retain(|e| *e != id);
            }
        }
        if let Some(edge) = self.edges.get_mut(&id) {
            edge.target = Some(new_target.clone());
        }
        if let Some(node) = self.nodes.get_mut(new_target) {
            node.incoming.push(id);
        }
        Ok(())
    }

    /// Detach an edge from its bound target, reverting it to the
    /// declared-but-unresolved state. The declared requirement name is kept,
    /// so later validation still reports or prunes it.
    pub fn unbind_target(&mut self, id: EdgeId) -> Result<()> {
        let edge = self
            .edges
            .get(&id)
            .ok_or_else(|| Error::GraphIntegrity(format!("no such edge: {:?}", id)))?;
        let Some(target) = edge.target.clone() else {
            return Ok(());
        };
        if let Some(node) = self.nodes.get_mut(&target) {
            node.incoming.retain(|e| *e != id);
        }
        if let Some(edge) = self.edges.get_mut(&id) {
            edge.target = None;
        }
        Ok(())
    }

    /// Move an edge to a different declaring module.
    pub fn rebind_source(&mut self, id: EdgeId, new_source: &ModuleId) -> Result<()> {
        let edge = self
            .edges
            .get(&id)
            .ok_or_else(|| Error::GraphIntegrity(format!("no such edge: {:?}", id)))?;
        if edge.requirement == *new_source {
            return Err(Error::GraphIntegrity(format!(
                "module '{}' cannot depend on itself",
                new_source
            )));
        }
        if !self.nodes.contains_key(new_source) {
            return Err(Error::UnknownModule(new_source.clone()));
        }
        let old_source = edge.source.clone();
        if let Some(old) = &old_source {
            if old == new_source {
                return Ok(());
            }
            if let Some(node) = self.nodes.get_mut(old) {
                node.outgoing.retain(|e| *e != id);
            }
        }
        if let Some(edge) = self.edges.get_mut(&id) {
            edge.source = Some(new_source.clone());
        }
        if let Some(node) = self.nodes.get_mut(new_source) {
            node.outgoing.push(id);
        }
        Ok(())
    }

    /// Bind every unresolved edge whose declared requirement names a
    /// newly loaded module. Called by the loader right after `add_node`.
    pub fn bind_pending(&mut self, loaded: &ModuleId) -> Result<usize> {
        let mut pending: Vec<EdgeId> = self
            .edges
            .iter()
            .filter(|(_, e)| e.target.is_none() && e.requirement == *loaded)
            .map(|(id, _)| *id)
            .collect();
        pending.sort_by_key(|e| e.0);

        let bound = pending.len();
        for eid in pending {
            self.rebind_target(eid, loaded)?;
        }
        Ok(bound)
    }

    /// Unload a module: detach every edge touching it, then discard the node.
    ///
    /// This is the only safe way to remove a node. The leftover-edge guard
    /// is unreachable when the detach loop is correct, but a node dropped
    /// with live edge handles would leave dangling references on neighbors.
    pub fn remove_node(&mut self, id: &ModuleId) -> Result<()> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| Error::UnknownModule(id.clone()))?;

        // Snapshot: remove_edge mutates the lists being walked.
        let touching: Vec<EdgeId> = node
            .outgoing
            .iter()
            .chain(node.incoming.iter())
            .copied()
            .collect();
        for eid in touching {
            self.remove_edge(eid);
        }

        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| Error::UnknownModule(id.clone()))?;
        if !node.outgoing.is_empty() || !node.incoming.is_empty() {
            return Err(Error::GraphIntegrity(format!(
                "module '{}' still has attached edges after detach",
                id
            )));
        }
        self.nodes.remove(id);
        self.order.retain(|m| m != id);
        tracing::debug!(module = %id, "removed node from dependency graph");
        Ok(())
    }

    /// All modules reachable from `id` over projecting edges, to arbitrary
    /// depth, in breadth-first declaration order.
    ///
    /// `LoadAfter` edges are excluded. Cycles are fine: a visited module is
    /// never re-expanded, and a module cyclically reachable from itself does
    /// appear in its own closure.
    pub fn transitive_dependencies(
        &self,
        id: &ModuleId,
        include_self: bool,
    ) -> Result<Vec<ModuleId>> {
        self.closure(id, include_self, false)
    }

    /// All modules that reach `id` over projecting edges. Symmetric to
    /// [`transitive_dependencies`](Self::transitive_dependencies), walking
    /// incoming edges instead.
    pub fn transitive_dependents(
        &self,
        id: &ModuleId,
        include_self: bool,
    ) -> Result<Vec<ModuleId>> {
        self.closure(id, include_self, true)
    }

    fn closure(&self, id: &ModuleId, include_self: bool, reverse: bool) -> Result<Vec<ModuleId>> {
        if !self.nodes.contains_key(id) {
            return Err(Error::UnknownModule(id.clone()));
        }

        let mut result = Vec::new();
        let mut in_result = HashSet::new();
        if include_self {
            result.push(id.clone());
            in_result.insert(id.clone());
        }

        let mut expanded = HashSet::new();
        let mut queue = VecDeque::from([id.clone()]);
        while let Some(current) = queue.pop_front() {
            if !expanded.insert(current.clone()) {
                continue;
            }
            let node = self.nodes.get(&current).ok_or_else(|| {
                Error::GraphIntegrity(format!("closure reached unloaded module '{}'", current))
            })?;
            let handles = if reverse { &node.incoming } else { &node.outgoing };
            for eid in handles {
                let Some(edge) = self.edges.get(eid) else {
                    continue;
                };
                if !edge.projects() {
                    continue;
                }
                let next = if reverse {
                    edge.source.as_ref()
                } else {
                    edge.target.as_ref()
                };
                let Some(next) = next else { continue };
                if in_result.insert(next.clone()) {
                    result.push(next.clone());
                }
                if !expanded.contains(next) {
                    queue.push_back(next.clone());
                }
            }
        }
        Ok(result)
    }

    /// Validate a module's declared requirements.
    ///
    /// Hard requirements with a missing or unloaded target fail validation
    /// and are reported; their edges stay attached for diagnostics. Soft
    /// requirements with a missing target are pruned. `LoadAfter` edges are
    /// never checked for presence. Iterates a snapshot since pruning mutates
    /// the edge list.
    pub fn validate(&mut self, id: &ModuleId) -> Result<Validation> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| Error::UnknownModule(id.clone()))?;
        let snapshot: Vec<EdgeId> = node.outgoing.clone();

        let mut missing = Vec::new();
        for eid in snapshot {
            let Some(edge) = self.edges.get(&eid) else {
                continue;
            };
            let satisfied = edge
                .target
                .as_ref()
                .map(|t| self.nodes.contains_key(t))
                .unwrap_or(false);
            match edge.kind {
                EdgeKind::HardRequire => {
                    if !satisfied {
                        missing.push(edge.requirement.clone());
                    }
                }
                EdgeKind::SoftRequire => {
                    if !satisfied {
                        let requirement = edge.requirement.clone();
                        self.remove_edge(eid);
                        tracing::debug!(
                            module = %id,
                            requirement = %requirement,
                            "pruned unsatisfied soft requirement"
                        );
                    }
                }
                EdgeKind::LoadAfter => {}
            }
        }

        if missing.is_empty() {
            Ok(Validation::Ok)
        } else {
            Ok(Validation::Unsatisfied(missing))
        }
    }

    /// A total load order over all loaded modules.
    ///
    /// Kahn's algorithm over every bound edge, of all three kinds - this is
    /// the one place `LoadAfter` participates. Ties break by registration
    /// order, so the result is deterministic. Cycles do not fail: members of
    /// a cycle are appended in registration order with a warning, since
    /// cyclic hard/soft requirements are legal graph shapes.
    pub fn load_order(&self) -> Vec<ModuleId> {
        let mut in_degree: HashMap<&ModuleId, usize> = HashMap::new();
        let mut dependents: HashMap<&ModuleId, Vec<&ModuleId>> = HashMap::new();
        for id in &self.order {
            in_degree.insert(id, 0);
            dependents.insert(id, Vec::new());
        }

        for id in &self.order {
            let Some(node) = self.nodes.get(id) else { continue };
            for eid in &node.outgoing {
                let Some(edge) = self.edges.get(eid) else { continue };
                let Some(target) = &edge.target else { continue };
                if !self.nodes.contains_key(target) {
                    continue;
                }
                if let Some(deg) = in_degree.get_mut(id) {
                    *deg += 1;
                }
                if let Some(list) = dependents.get_mut(target) {
                    list.push(id);
                }
            }
        }

        let mut queue: VecDeque<&ModuleId> = self
            .order
            .iter()
            .filter(|id| in_degree.get(*id).copied() == Some(0))
            .collect();

        let mut result: Vec<ModuleId> = Vec::new();
        let mut placed: HashSet<&ModuleId> = HashSet::new();
        while let Some(current) = queue.pop_front() {
            result.push(current.clone());
            placed.insert(current);
            if let Some(deps) = dependents.get(current) {
                for dependent in deps.clone() {
                    if let Some(deg) = in_degree.get_mut(dependent) {
                        *deg -= 1;
                        if *deg == 0 {
                            queue.push_back(dependent);
                        }
                    }
                }
            }
        }

        if result.len() != self.order.len() {
            let leftover: Vec<&ModuleId> = self
                .order
                .iter()
                .filter(|id| !placed.contains(id))
                .collect();
            tracing::warn!(
                modules = ?leftover.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
                "dependency cycle; ordering cycle members by registration order"
            );
            for id in leftover {
                result.push(id.clone());
            }
        }
        result
    }

    /// Get statistics about the graph
    pub fn stats(&self) -> GraphStats {
        let mut hard = 0;
        let mut soft = 0;
        let mut load_after = 0;
        let mut unresolved = 0;
        for edge in self.edges.values() {
            match edge.kind {
                EdgeKind::HardRequire => hard += 1,
                EdgeKind::SoftRequire => soft += 1,
                EdgeKind::LoadAfter => load_after += 1,
            }
            if !edge.is_bound() {
                unresolved += 1;
            }
        }
        GraphStats {
            modules: self.nodes.len(),
            edges: self.edges.len(),
            hard_require: hard,
            soft_require: soft,
            load_after,
            unresolved,
        }
    }
}

/// Statistics about a dependency graph
#[derive(Debug, Clone, serde::Serialize)]
pub struct GraphStats {
    pub modules: usize,
    pub edges: usize,
    pub hard_require: usize,
    pub soft_require: usize,
    pub load_after: usize,
    pub unresolved: usize,
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Dependency Graph Statistics:")?;
        writeln!(f, "  Modules: {}", self.modules)?;
        writeln!(
            f,
            "  Edges: {} (hard: {}, soft: {}, load-after: {})",
            self.edges, self.hard_require, self.soft_require, self.load_after
        )?;
        writeln!(f, "  Unresolved: {}", self.unresolved)
    }
}
