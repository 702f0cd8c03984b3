use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use crate::id::ModuleId;
use crate::loader::{BundleLoader, ModuleHost};
use crate::manifest::MANIFEST_FILE;

/// Watches a modules directory and hot-reloads bundles as their manifests
/// appear, change, or disappear. Reloads honor the same dependent guard as
/// any other unload: a module still required by others stays loaded.
pub struct Watcher {
    dir: PathBuf,
    loader: BundleLoader,
    host: ModuleHost,
    /// manifest path -> (module, content hash) for everything we loaded
    bundles: HashMap<PathBuf, (ModuleId, String)>,
}

impl Watcher {
    pub fn new(dir: PathBuf, host: ModuleHost) -> Self {
        Self {
            dir,
            loader: BundleLoader::new(),
            host,
            bundles: HashMap::new(),
        }
    }

    pub fn run(mut self) -> anyhow::Result<()> {
        self.prime()?;

        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
        watcher.watch(&self.dir, RecursiveMode::Recursive)?;

        println!("👀 Watching for module changes in {:?}...", self.dir);

        for res in rx {
            match res {
                Ok(event) => self.handle_event(event),
                Err(e) => println!("watch error: {:?}", e),
            }
        }

        Ok(())
    }

    /// Map already-loaded modules back to their bundle paths so later
    /// events can tell changed bundles from unchanged ones.
    fn prime(&mut self) -> anyhow::Result<()> {
        for path in self.loader.discover(&self.dir)? {
            let Ok(manifest) = self.loader.read_manifest(&path) else {
                continue;
            };
            if !self.host.graph().contains(&manifest.name) {
                continue;
            }
            let hash = self.loader.bundle_hash(&path)?;
            self.bundles.insert(path, (manifest.name, hash));
        }
        Ok(())
    }

    fn handle_event(&mut self, event: notify::Event) {
        use notify::EventKind;
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => {
                for path in event.paths {
                    if path.is_file() && self.is_manifest(&path) {
                        self.process_bundle(&path);
                    }
                }
            }
            EventKind::Remove(_) => {
                for path in event.paths {
                    if self.is_manifest(&path) {
                        self.remove_bundle(&path);
                    }
                }
            }
            _ => {}
        }
    }

    fn is_manifest(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if name == MANIFEST_FILE {
            return true;
        }
        // Standalone manifests live directly in the modules root.
        path.parent() == Some(self.dir.as_path())
            && self.loader.file_filters().iter().any(|f| f.is_match(name))
    }

    fn process_bundle(&mut self, path: &Path) {
        let hash = match self.loader.bundle_hash(path) {
            Ok(h) => h,
            Err(_) => return,
        };

        if let Some((id, known_hash)) = self.bundles.get(path) {
            if *known_hash == hash {
                return;
            }
            let id = id.clone();
            println!("📝 Module bundle changed: {}", id);
            if let Err(e) = self.host.unload(&id) {
                println!("⚠️  Cannot reload {}: {}", id, e);
                return;
            }
            self.bundles.remove(path);
        }

        let manifest = match self.loader.read_manifest(path) {
            Ok(m) => m,
            Err(e) => {
                println!("❌ Invalid bundle {:?}: {}", path, e);
                return;
            }
        };
        let name = manifest.name.clone();
        match self.host.load(manifest) {
            Ok(id) => {
                println!("✅ Loaded module: {}", id);
                self.bundles.insert(path.to_path_buf(), (id, hash));
            }
            Err(e) => {
                println!("❌ Failed to load {}: {}", name, e);
            }
        }
    }

    fn remove_bundle(&mut self, path: &Path) {
        let Some((id, hash)) = self.bundles.remove(path) else {
            return;
        };
        match self.host.unload(&id) {
            Ok(()) => println!("🗑️  Unloaded module: {}", id),
            Err(e) => {
                println!("⚠️  Keeping {} loaded: {}", id, e);
                self.bundles.insert(path.to_path_buf(), (id, hash));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_bundle(dir: &Path, name: &str, body: &str) -> PathBuf {
        let bundle = dir.join(name);
        std::fs::create_dir_all(&bundle).unwrap();
        let manifest = bundle.join(MANIFEST_FILE);
        std::fs::write(&manifest, body).unwrap();
        manifest
    }

    #[test]
    fn test_process_new_and_changed_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_bundle(dir.path(), "world", "name = \"world\"\nversion = \"1\"\n");

        let mut watcher = Watcher::new(dir.path().to_path_buf(), ModuleHost::new());
        watcher.process_bundle(&manifest);
        let world = ModuleId::parse("world").unwrap();
        assert!(watcher.host.graph().contains(&world));

        // Unchanged content is a no-op; changed content reloads.
        watcher.process_bundle(&manifest);
        std::fs::write(&manifest, "name = \"world\"\nversion = \"2\"\n").unwrap();
        watcher.process_bundle(&manifest);
        assert_eq!(
            watcher.host.manifest(&world).unwrap().version,
            "2".to_string()
        );
    }

    #[test]
    fn test_remove_bundle_honors_dependents() {
        let dir = tempfile::tempdir().unwrap();
        let economy = write_bundle(dir.path(), "economy", "name = \"economy\"\nversion = \"1\"\n");
        let shops = write_bundle(
            dir.path(),
            "shops",
            "name = \"shops\"\nversion = \"1\"\nrequires = [\"economy\"]\n",
        );

        let mut watcher = Watcher::new(dir.path().to_path_buf(), ModuleHost::new());
        watcher.process_bundle(&economy);
        watcher.process_bundle(&shops);

        let economy_id = ModuleId::parse("economy").unwrap();
        // economy stays loaded while shops requires it.
        watcher.remove_bundle(&economy);
        assert!(watcher.host.graph().contains(&economy_id));

        watcher.remove_bundle(&shops);
        watcher.remove_bundle(&economy);
        assert!(!watcher.host.graph().contains(&economy_id));
    }

    #[test]
    fn test_is_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = Watcher::new(dir.path().to_path_buf(), ModuleHost::new());

        assert!(watcher.is_manifest(&dir.path().join("world").join(MANIFEST_FILE)));
        assert!(watcher.is_manifest(&dir.path().join("solo.toml")));
        assert!(!watcher.is_manifest(&dir.path().join("world").join("notes.txt")));
        assert!(!watcher.is_manifest(&dir.path().join("deep").join("solo.toml")));
    }
}
