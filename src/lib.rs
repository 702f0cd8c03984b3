//! # Modhost - Module Host Substrate
//!
//! Live dependency graph and cascading symbol resolution for independently
//! packaged modules loaded into a long-running host process.
//!
//! Modhost provides:
//! - A typed dependency-edge model (hard, soft, load-order) over loaded modules
//! - Graph maintenance with closure queries and requirement validation
//! - Deterministic, cycle-safe cascading symbol resolution across dependencies
//! - A bundle loader with manifest descriptors and enable/disable lifecycle
//! - HTTP inspection surface and hot-reload watching for the modules directory

pub mod config;
pub mod edge;
pub mod graph;
pub mod id;
pub mod loader;
pub mod manifest;
pub mod resolve;
pub mod server;
pub mod symbol;
pub mod ui;
pub mod watcher;

// Re-exports for convenient access
pub use edge::{Edge, EdgeId, EdgeKind};
pub use graph::{DependencyGraph, GraphStats, Validation};
pub use id::ModuleId;
pub use loader::{BundleLoader, LoadReport, ModuleHost};
pub use manifest::ModuleManifest;
pub use resolve::{Resolution, ResolutionScope, SymbolSource};
pub use symbol::{Export, ExportKind, SymbolTable};

/// Result type alias for Modhost operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Modhost operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid module id: {0}")]
    InvalidId(String),

    #[error("Module already present: {0}")]
    AlreadyPresent(ModuleId),

    #[error("Unknown module: {0}")]
    UnknownModule(ModuleId),

    #[error("Graph integrity violation: {0}")]
    GraphIntegrity(String),

    #[error("Unsatisfied hard requirements for {module}: missing {}", .missing.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", "))]
    UnsatisfiedRequirement {
        module: ModuleId,
        missing: Vec<ModuleId>,
    },

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
