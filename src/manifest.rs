//! Module manifests - the `module.toml` descriptor at the root of a bundle
//!
//! The manifest is the only file format this crate owns. It names the
//! module, its version, its declared relationships (in significant order -
//! declaration order becomes resolution cascade order) and the symbols the
//! module publishes.
//!
//! ```toml
//! name = "shops"
//! version = "1.2.0"
//! requires = ["economy"]
//! requires_optional = ["regions"]
//! load_after = ["world-gen"]
//!
//! [[export]]
//! name = "shop_registry"
//! kind = "service"
//! ```

use crate::edge::EdgeKind;
use crate::id::ModuleId;
use crate::symbol::{Export, ExportKind, SymbolTable};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the manifest file inside a module bundle.
pub const MANIFEST_FILE: &str = "module.toml";

/// One declared export in a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDecl {
    /// Symbol name
    pub name: String,
    /// Category, defaults to `service`
    #[serde(default = "default_export_kind")]
    pub kind: ExportKind,
}

fn default_export_kind() -> ExportKind {
    ExportKind::Service
}

/// A parsed module descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Module name; doubles as its graph id
    pub name: ModuleId,
    /// Module version string (opaque to the host)
    pub version: String,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Authors
    #[serde(default)]
    pub authors: Vec<String>,
    /// Modules this one cannot load without
    #[serde(default)]
    pub requires: Vec<ModuleId>,
    /// Modules this one uses when present
    #[serde(default)]
    pub requires_optional: Vec<ModuleId>,
    /// Load-ordering hints; never affect resolution
    #[serde(default)]
    pub load_after: Vec<ModuleId>,
    /// Declared exports seeding the module's symbol table
    #[serde(default, rename = "export")]
    pub exports: Vec<ExportDecl>,
}

impl ModuleManifest {
    /// Parse a manifest from TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        let manifest: ModuleManifest =
            toml::from_str(text).map_err(|e| Error::Manifest(e.to_string()))?;
        manifest.check()?;
        Ok(manifest)
    }

    /// Read and parse a manifest file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    fn check(&self) -> Result<()> {
        for declared in self
            .requires
            .iter()
            .chain(self.requires_optional.iter())
            .chain(self.load_after.iter())
        {
            if *declared == self.name {
                return Err(Error::Manifest(format!(
                    "module '{}' declares a dependency on itself",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// The declared relationships as (kind, target-name) pairs, in the
    /// order they become edges: hard requirements first, then optional,
    /// then load-ordering hints, each list in declaration order.
    pub fn relationships(&self) -> Vec<(EdgeKind, ModuleId)> {
        let mut out = Vec::new();
        for name in &self.requires {
            out.push((EdgeKind::HardRequire, name.clone()));
        }
        for name in &self.requires_optional {
            out.push((EdgeKind::SoftRequire, name.clone()));
        }
        for name in &self.load_after {
            out.push((EdgeKind::LoadAfter, name.clone()));
        }
        out
    }

    /// Build the module's local symbol table from its declared exports.
    pub fn symbol_table(&self) -> SymbolTable {
        let mut table = SymbolTable::new();
        for decl in &self.exports {
            table.define(Export::new(decl.name.clone(), self.name.clone(), decl.kind));
        }
        table
    }
}
