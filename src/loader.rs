//! Module loading - bundle discovery and the host composition root
//!
//! A *bundle* is a directory containing a `module.toml`, or a standalone
//! manifest file matching the loader's filename filters. The
//! [`BundleLoader`] finds bundles and reads their manifests; the
//! [`ModuleHost`] turns manifests into graph nodes, edges, and symbol
//! tables, and owns the enable/disable lifecycle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use regex::Regex;
use crate::config;
use crate::edge::EdgeId;
use crate::graph::{DependencyGraph, GraphStats, Validation};
use crate::id::ModuleId;
use crate::manifest::{MANIFEST_FILE, ModuleManifest};
use crate::resolve::{Resolution, ResolutionScope, TableSource};
use crate::symbol::{Export, SymbolTable};
use crate::{Error, Result};

fn manifest_filter() -> &'static Regex {
    static FILTER: OnceLock<Regex> = OnceLock::new();
    FILTER.get_or_init(|| Regex::new(r"(?i)\.toml$").expect("static filter pattern"))
}

/// Finds module bundles on disk and reads their manifests.
pub struct BundleLoader {
    filters: Vec<Regex>,
}

impl BundleLoader {
    /// Create a loader with the default filename filters
    pub fn new() -> Self {
        Self {
            filters: vec![manifest_filter().clone()],
        }
    }

    /// The filename filters standalone manifests must match
    pub fn file_filters(&self) -> &[Regex] {
        &self.filters
    }

    /// Discover bundle manifest paths in a directory, sorted by name.
    ///
    /// A subdirectory containing `module.toml` is a bundle; so is a
    /// standalone file matching the filename filters. Anything else is
    /// skipped. The scan is single-level: bundles do not nest.
    pub fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .collect();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            if path.is_dir() {
                let manifest = path.join(MANIFEST_FILE);
                if manifest.is_file() {
                    found.push(manifest);
                }
            } else if path.is_file() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name != config::CONFIG_FILE
                    && self.filters.iter().any(|f| f.is_match(&name))
                {
                    found.push(path);
                }
            }
        }
        Ok(found)
    }

    /// Read and parse a bundle's manifest
    pub fn read_manifest(&self, path: &Path) -> Result<ModuleManifest> {
        ModuleManifest::from_path(path)
    }

    /// Content hash of a bundle's manifest, for change detection
    pub fn bundle_hash(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(blake3::hash(&bytes).to_string())
    }
}

impl Default for BundleLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle callbacks fired when a module's enabled state flips.
pub trait ModuleHooks: Send + Sync {
    fn on_enable(&self, _module: &ModuleId) {}
    fn on_disable(&self, _module: &ModuleId) {}
}

/// Summary of a directory load.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct LoadReport {
    /// Modules admitted to the graph, in load order
    pub loaded: Vec<ModuleId>,
    /// (module or file name, reason) pairs for everything rejected
    pub failed: Vec<(String, String)>,
}

impl std::fmt::Display for LoadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Load Report:")?;
        writeln!(f, "  Loaded: {}", self.loaded.len())?;
        writeln!(f, "  Failed: {}", self.failed.len())
    }
}

/// The host: owns the dependency graph, every module's symbol table and
/// manifest, the enabled flags, and the host-level base symbol table that
/// anchors every module's parent scope.
pub struct ModuleHost {
    graph: DependencyGraph,
    tables: HashMap<ModuleId, SymbolTable>,
    manifests: HashMap<ModuleId, ModuleManifest>,
    enabled: HashMap<ModuleId, bool>,
    hashes: HashMap<ModuleId, String>,
    base: SymbolTable,
    hooks: Option<Box<dyn ModuleHooks>>,
}

impl ModuleHost {
    /// Create an empty host
    pub fn new() -> Self {
        Self {
            graph: DependencyGraph::new(),
            tables: HashMap::new(),
            manifests: HashMap::new(),
            enabled: HashMap::new(),
            hashes: HashMap::new(),
            base: SymbolTable::new(),
            hooks: None,
        }
    }

    /// Attach lifecycle hooks
    pub fn with_hooks(mut self, hooks: Box<dyn ModuleHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// The live dependency graph
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Publish a symbol into the host's base table. Modules see these
    /// through their parent scope, after their own table.
    pub fn define_host_export(&mut self, export: Export) {
        self.base.define(export);
    }

    /// A module's parsed manifest
    pub fn manifest(&self, id: &ModuleId) -> Option<&ModuleManifest> {
        self.manifests.get(id)
    }

    /// A module's local symbol table
    pub fn table(&self, id: &ModuleId) -> Option<&SymbolTable> {
        self.tables.get(id)
    }

    /// Whether a module is currently enabled
    pub fn is_enabled(&self, id: &ModuleId) -> bool {
        self.enabled.get(id).copied().unwrap_or(false)
    }

    /// The recorded bundle hash for a module, if loaded from disk
    pub fn bundle_hash(&self, id: &ModuleId) -> Option<&str> {
        self.hashes.get(id).map(|s| s.as_str())
    }

    /// Loaded module ids, in registration order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleId> {
        self.graph.modules()
    }

    /// Register a module into the graph without validating it.
    ///
    /// Creates the node, declares its edges in manifest order, binds any
    /// earlier modules' unresolved edges that name this one, and stores its
    /// symbol table. The module is not admitted until
    /// [`validate`](Self::validate) passes.
    pub fn register(&mut self, manifest: ModuleManifest) -> Result<ModuleId> {
        let id = manifest.name.clone();
        self.graph.add_node(id.clone())?;
        for (kind, requirement) in manifest.relationships() {
            self.graph.add_edge(kind, &id, requirement)?;
        }
        self.graph.bind_pending(&id)?;
        self.tables.insert(id.clone(), manifest.symbol_table());
        self.enabled.insert(id.clone(), false);
        self.manifests.insert(id.clone(), manifest);
        tracing::debug!(module = %id, "registered module");
        Ok(id)
    }

    /// Validate a module's declared requirements (pruning missing soft ones)
    pub fn validate(&mut self, id: &ModuleId) -> Result<Validation> {
        self.graph.validate(id)
    }

    /// Register and validate a single module.
    ///
    /// An unsatisfied hard requirement rolls the module back out of the
    /// graph and fails the load; other modules are unaffected.
    pub fn load(&mut self, manifest: ModuleManifest) -> Result<ModuleId> {
        let id = self.register(manifest)?;
        match self.graph.validate(&id)? {
            Validation::Ok => {
                tracing::info!(module = %id, "loaded module");
                Ok(id)
            }
            Validation::Unsatisfied(missing) => {
                self.discard(&id)?;
                Err(Error::UnsatisfiedRequirement { module: id, missing })
            }
        }
    }

    /// Discover, register, and validate every bundle in a directory.
    ///
    /// All bundles register before any validation runs, so declaration
    /// order across bundles does not matter; validation then walks the load
    /// order, which lets a failure cascade to the modules that hard-require
    /// the failed one.
    pub fn load_dir(&mut self, dir: &Path, loader: &BundleLoader) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        let mut manifests = Vec::new();
        for path in loader.discover(dir)? {
            match loader.read_manifest(&path) {
                Ok(manifest) => manifests.push((path, manifest)),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "unreadable bundle");
                    report.failed.push((path.display().to_string(), e.to_string()));
                }
            }
        }

        let mut registered = Vec::new();
        for (path, manifest) in manifests {
            let id = manifest.name.clone();
            let hash = loader.bundle_hash(&path).ok();
            match self.register(manifest) {
                Ok(id) => {
                    if let Some(hash) = hash {
                        self.hashes.insert(id.clone(), hash);
                    }
                    registered.push(id);
                }
                Err(e) => report.failed.push((id.to_string(), e.to_string())),
            }
        }

        for id in self.graph.load_order() {
            if !registered.contains(&id) || !self.graph.contains(&id) {
                continue;
            }
            match self.graph.validate(&id)? {
                Validation::Ok => report.loaded.push(id),
                Validation::Unsatisfied(missing) => {
                    self.discard(&id)?;
                    let names: Vec<&str> = missing.iter().map(|m| m.as_str()).collect();
                    tracing::warn!(module = %id, missing = ?names, "module rejected");
                    report
                        .failed
                        .push((id.to_string(), format!("unsatisfied hard requirements: {}", names.join(", "))));
                }
            }
        }
        Ok(report)
    }

    /// Flip a module's enabled state, firing the lifecycle hook on change.
    pub fn set_enabled(&mut self, id: &ModuleId, enabled: bool) -> Result<()> {
        let state = self
            .enabled
            .get_mut(id)
            .ok_or_else(|| Error::UnknownModule(id.clone()))?;
        if *state == enabled {
            return Ok(());
        }
        *state = enabled;
        if enabled {
            tracing::info!(module = %id, "enabling module");
            if let Some(hooks) = &self.hooks {
                hooks.on_enable(id);
            }
        } else {
            tracing::info!(module = %id, "disabling module");
            if let Some(hooks) = &self.hooks {
                hooks.on_disable(id);
            }
        }
        Ok(())
    }

    /// Unload a module.
    ///
    /// Refuses while loaded modules still depend on it, transitively - the
    /// caller must unload dependents first (see
    /// [`unload_order`](Self::unload_order)). On success the module is
    /// disabled, every edge touching it is detached, and its node dropped.
    pub fn unload(&mut self, id: &ModuleId) -> Result<()> {
        if !self.graph.contains(id) {
            return Err(Error::UnknownModule(id.clone()));
        }
        let dependents = self.graph.transitive_dependents(id, false)?;
        if !dependents.is_empty() {
            let names: Vec<&str> = dependents.iter().map(|m| m.as_str()).collect();
            return Err(Error::GraphIntegrity(format!(
                "cannot unload '{}': still required by {}",
                id,
                names.join(", ")
            )));
        }
        self.set_enabled(id, false)?;
        self.discard(id)
    }

    /// A safe unload order for a module: its transitive dependents first,
    /// the module itself last. Reverse of the load order, restricted to the
    /// dependent closure.
    pub fn unload_order(&self, id: &ModuleId) -> Result<Vec<ModuleId>> {
        let closure = self.graph.transitive_dependents(id, true)?;
        let mut order: Vec<ModuleId> = self
            .graph
            .load_order()
            .into_iter()
            .filter(|m| closure.contains(m))
            .collect();
        order.reverse();
        Ok(order)
    }

    /// Resolve a symbol from a module's point of view: its own table, then
    /// the host base table, then its dependencies in declaration order.
    pub fn resolve(&self, id: &ModuleId, name: &str) -> Result<Resolution> {
        if !self.graph.contains(id) {
            return Err(Error::UnknownModule(id.clone()));
        }
        let host_source = TableSource::new(&self.base);
        ResolutionScope::new(id, &self.graph, &self.tables)
            .with_parent(&host_source)
            .resolve(name)
    }

    /// Graph statistics
    pub fn stats(&self) -> GraphStats {
        self.graph.stats()
    }

    /// Remove a module's node and every host-side record of it. Incoming
    /// edges from other modules revert to declared-but-unresolved rather
    /// than disappearing, so their owners still validate against the loss.
    fn discard(&mut self, id: &ModuleId) -> Result<()> {
        if let Some(node) = self.graph.node(id) {
            let incoming: Vec<EdgeId> = node.incoming().to_vec();
            for eid in incoming {
                self.graph.unbind_target(eid)?;
            }
        }
        self.graph.remove_node(id)?;
        self.tables.remove(id);
        self.manifests.remove(id);
        self.enabled.remove(id);
        self.hashes.remove(id);
        Ok(())
    }
}

impl Default for ModuleHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::ExportKind;
    use std::sync::{Arc, Mutex};

    fn id(name: &str) -> ModuleId {
        ModuleId::parse(name).unwrap()
    }

    fn manifest(text: &str) -> ModuleManifest {
        ModuleManifest::parse(text).unwrap()
    }

    fn write_bundle(dir: &Path, name: &str, body: &str) {
        let bundle = dir.join(name);
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::write(bundle.join(MANIFEST_FILE), body).unwrap();
    }

    #[test]
    fn test_discover_finds_bundles_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), "beta", "name = \"beta\"\nversion = \"1\"\n");
        write_bundle(dir.path(), "alpha", "name = \"alpha\"\nversion = \"1\"\n");
        // A standalone manifest file also counts as a bundle.
        std::fs::write(
            dir.path().join("gamma.toml"),
            "name = \"gamma\"\nversion = \"1\"\n",
        )
        .unwrap();
        // Not bundles: an empty directory and a stray file.
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let loader = BundleLoader::new();
        let found = loader.discover(dir.path()).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .to_string()
            })
            .collect();
        assert_eq!(
            names,
            vec!["alpha/module.toml", "beta/module.toml", "gamma.toml"]
        );
    }

    #[test]
    fn test_bundle_hash_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.toml");
        std::fs::write(&path, "name = \"m\"\nversion = \"1\"\n").unwrap();

        let loader = BundleLoader::new();
        let first = loader.bundle_hash(&path).unwrap();
        let again = loader.bundle_hash(&path).unwrap();
        assert_eq!(first, again);

        std::fs::write(&path, "name = \"m\"\nversion = \"2\"\n").unwrap();
        assert_ne!(first, loader.bundle_hash(&path).unwrap());
    }

    #[test]
    fn test_load_satisfied() {
        let mut host = ModuleHost::new();
        host.load(manifest("name = \"economy\"\nversion = \"1\"\n")).unwrap();
        let id = host
            .load(manifest(
                "name = \"shops\"\nversion = \"1\"\nrequires = [\"economy\"]\n",
            ))
            .unwrap();
        assert!(host.graph().contains(&id));
        assert!(!host.is_enabled(&id));
    }

    #[test]
    fn test_load_unsatisfied_rolls_back() {
        let mut host = ModuleHost::new();
        let result = host.load(manifest(
            "name = \"shops\"\nversion = \"1\"\nrequires = [\"economy\"]\n",
        ));
        match result {
            Err(Error::UnsatisfiedRequirement { module, missing }) => {
                assert_eq!(module, id("shops"));
                assert_eq!(missing, vec![id("economy")]);
            }
            other => panic!("expected unsatisfied requirement, got {:?}", other.map(|m| m.to_string())),
        }
        // Never admitted; the rest of the host is untouched.
        assert!(!host.graph().contains(&id("shops")));
        assert_eq!(host.graph().len(), 0);
    }

    #[test]
    fn test_load_missing_soft_requirement_is_pruned() {
        let mut host = ModuleHost::new();
        let id = host
            .load(manifest(
                "name = \"shops\"\nversion = \"1\"\nrequires_optional = [\"regions\"]\n",
            ))
            .unwrap();
        assert!(host.graph().node(&id).unwrap().outgoing().is_empty());
    }

    #[test]
    fn test_load_dir_validates_in_order_and_cascades() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), "economy", "name = \"economy\"\nversion = \"1\"\nrequires = [\"vault\"]\n");
        write_bundle(dir.path(), "shops", "name = \"shops\"\nversion = \"1\"\nrequires = [\"economy\"]\n");
        write_bundle(dir.path(), "world", "name = \"world\"\nversion = \"1\"\n");

        let mut host = ModuleHost::new();
        let report = host.load_dir(dir.path(), &BundleLoader::new()).unwrap();

        // vault is nowhere: economy fails, and shops cascades with it.
        assert_eq!(report.loaded, vec![id("world")]);
        assert_eq!(report.failed.len(), 2);
        assert!(!host.graph().contains(&id("economy")));
        assert!(!host.graph().contains(&id("shops")));
        assert!(host.graph().contains(&id("world")));
    }

    #[test]
    fn test_load_dir_records_bundle_hashes() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), "world", "name = \"world\"\nversion = \"1\"\n");

        let mut host = ModuleHost::new();
        host.load_dir(dir.path(), &BundleLoader::new()).unwrap();
        assert!(host.bundle_hash(&id("world")).is_some());
    }

    struct RecordingHooks {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl ModuleHooks for RecordingHooks {
        fn on_enable(&self, module: &ModuleId) {
            self.events.lock().unwrap().push(format!("enable:{}", module));
        }
        fn on_disable(&self, module: &ModuleId) {
            self.events.lock().unwrap().push(format!("disable:{}", module));
        }
    }

    #[test]
    fn test_enable_disable_fires_hooks_once_per_change() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut host = ModuleHost::new().with_hooks(Box::new(RecordingHooks {
            events: events.clone(),
        }));
        let m = host.load(manifest("name = \"world\"\nversion = \"1\"\n")).unwrap();

        host.set_enabled(&m, true).unwrap();
        host.set_enabled(&m, true).unwrap(); // no change, no hook
        host.set_enabled(&m, false).unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["enable:world".to_string(), "disable:world".to_string()]
        );
    }

    #[test]
    fn test_unload_refused_while_depended_on() {
        let mut host = ModuleHost::new();
        host.load(manifest("name = \"economy\"\nversion = \"1\"\n")).unwrap();
        host.load(manifest(
            "name = \"shops\"\nversion = \"1\"\nrequires = [\"economy\"]\n",
        ))
        .unwrap();

        assert!(matches!(
            host.unload(&id("economy")),
            Err(Error::GraphIntegrity(_))
        ));

        host.unload(&id("shops")).unwrap();
        host.unload(&id("economy")).unwrap();
        assert!(host.graph().is_empty());
    }

    #[test]
    fn test_unload_order_is_dependents_first() {
        let mut host = ModuleHost::new();
        host.load(manifest("name = \"economy\"\nversion = \"1\"\n")).unwrap();
        host.load(manifest(
            "name = \"shops\"\nversion = \"1\"\nrequires = [\"economy\"]\n",
        ))
        .unwrap();
        host.load(manifest(
            "name = \"auctions\"\nversion = \"1\"\nrequires = [\"shops\"]\n",
        ))
        .unwrap();

        let order = host.unload_order(&id("economy")).unwrap();
        assert_eq!(order, vec![id("auctions"), id("shops"), id("economy")]);
    }

    #[test]
    fn test_resolve_prefers_local_then_host_then_dependencies() {
        let mut host = ModuleHost::new();
        host.define_host_export(Export::new("scheduler", id("host"), ExportKind::Service));
        host.load(manifest(
            "name = \"economy\"\nversion = \"1\"\n\n[[export]]\nname = \"balance\"\n",
        ))
        .unwrap();
        host.load(manifest(
            "name = \"shops\"\nversion = \"1\"\nrequires = [\"economy\"]\n\n[[export]]\nname = \"shop\"\nkind = \"command\"\n",
        ))
        .unwrap();

        let shops = id("shops");
        // Local table first.
        let hit = host.resolve(&shops, "shop").unwrap();
        assert_eq!(hit.found().unwrap().provider, shops);
        // Host base before dependencies.
        let hit = host.resolve(&shops, "scheduler").unwrap();
        assert_eq!(hit.found().unwrap().provider, id("host"));
        // Dependencies last.
        let hit = host.resolve(&shops, "balance").unwrap();
        assert_eq!(hit.found().unwrap().provider, id("economy"));
        // A miss is a value, not an error.
        assert_eq!(host.resolve(&shops, "nothing").unwrap(), Resolution::NotFound);
    }

    #[test]
    fn test_late_registration_binds_earlier_edges() {
        let mut host = ModuleHost::new();
        // Register out of order: shops first, economy later.
        host.register(manifest(
            "name = \"shops\"\nversion = \"1\"\nrequires = [\"economy\"]\n",
        ))
        .unwrap();
        host.register(manifest(
            "name = \"economy\"\nversion = \"1\"\n\n[[export]]\nname = \"balance\"\n",
        ))
        .unwrap();

        assert_eq!(host.validate(&id("shops")).unwrap(), Validation::Ok);
        let hit = host.resolve(&id("shops"), "balance").unwrap();
        assert_eq!(hit.found().unwrap().provider, id("economy"));
    }
}
