//! Modhost CLI - Command-line interface for the module host substrate

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use modhost::config;
use modhost::loader::{BundleLoader, LoadReport, ModuleHost};
use modhost::ui::{self, Icons, ModuleRow, Spinner};
use modhost::ModuleId;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "modhost")]
#[command(version = "0.1.0")]
#[command(about = "Module host substrate - dependency graph and symbol resolution for loaded modules")]
#[command(long_about = r#"
Modhost loads module bundles from a directory, maintains their dependency
graph, and resolves symbols across it, enabling:
  • Validation of hard/soft requirements before a module is admitted
  • Transitive dependency and dependent queries
  • Deterministic cascading symbol resolution
  • Safe load and unload ordering

Example usage:
  modhost load --dir ./modules
  modhost deps shops --dir ./modules
  modhost resolve shops balance --dir ./modules
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every bundle in the modules directory and report the result
    Load {
        /// Path to the modules directory
        #[arg(short, long, default_value = "modules")]
        dir: PathBuf,

        /// Enable modules after loading, in load order
        #[arg(short, long)]
        enable: bool,
    },

    /// Validate bundles without enabling anything
    Validate {
        /// Path to the modules directory
        #[arg(short, long, default_value = "modules")]
        dir: PathBuf,
    },

    /// List loaded modules
    List {
        /// Path to the modules directory
        #[arg(short, long, default_value = "modules")]
        dir: PathBuf,
    },

    /// Show a module's transitive dependencies
    Deps {
        /// Module name
        module: String,

        /// Path to the modules directory
        #[arg(short, long, default_value = "modules")]
        dir: PathBuf,

        /// Include the module itself in the closure
        #[arg(long)]
        include_self: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the modules that depend on a module
    Dependents {
        /// Module name
        module: String,

        /// Path to the modules directory
        #[arg(short, long, default_value = "modules")]
        dir: PathBuf,

        /// Include the module itself in the closure
        #[arg(long)]
        include_self: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Resolve a symbol from a module's point of view
    Resolve {
        /// Module name
        module: String,

        /// Symbol name to resolve
        symbol: String,

        /// Path to the modules directory
        #[arg(short, long, default_value = "modules")]
        dir: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the computed load order
    Order {
        /// Path to the modules directory
        #[arg(short, long, default_value = "modules")]
        dir: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show a safe unload order for a module (dependents first)
    UnloadOrder {
        /// Module name
        module: String,

        /// Path to the modules directory
        #[arg(short, long, default_value = "modules")]
        dir: PathBuf,
    },

    /// Show statistics about the dependency graph
    Stats {
        /// Path to the modules directory
        #[arg(short, long, default_value = "modules")]
        dir: PathBuf,
    },

    /// Serve the dependency graph over HTTP
    Serve {
        /// Path to the modules directory
        #[arg(short, long, default_value = "modules")]
        dir: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "7117")]
        port: u16,
    },

    /// Watch the modules directory and hot-reload changed bundles
    Watch {
        /// Path to the modules directory
        #[arg(short, long, default_value = "modules")]
        dir: PathBuf,
    },
}

fn load_host(dir: &Path) -> anyhow::Result<(ModuleHost, LoadReport)> {
    let loader = BundleLoader::new();
    let mut host = ModuleHost::new();
    let report = host.load_dir(dir, &loader)?;
    Ok((host, report))
}

fn report_failures(report: &LoadReport) {
    for (name, reason) in &report.failed {
        ui::error(&format!("{}: {}", name, reason));
    }
}

fn parse_module(name: &str) -> anyhow::Result<ModuleId> {
    Ok(ModuleId::parse(name)?)
}

fn print_modules(names: &[ModuleId], format: &str) -> anyhow::Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(names)?);
    } else if names.is_empty() {
        println!("∅ No modules.");
    } else {
        for name in names {
            println!("- {}", name);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Load { dir, enable } => {
            println!("{} Loading modules from {:?}", Icons::ROCKET, dir);

            let spinner = Spinner::new("Scanning bundles");
            let (mut host, report) = load_host(&dir)?;
            spinner.finish_with_message("Scan complete");

            report_failures(&report);

            // Every admitted module gets its data directory up front.
            for id in &report.loaded {
                config::ensure_data_dir(&config::data_dir_in(&dir, id))?;
            }

            if enable {
                for id in report.loaded.clone() {
                    host.set_enabled(&id, true)?;
                }
            }

            let rows: Vec<ModuleRow> = report
                .loaded
                .iter()
                .filter_map(|id| host.manifest(id).map(|m| (id, m)))
                .map(|(id, manifest)| {
                    let state = if host.is_enabled(id) { "enabled" } else { "loaded" };
                    ModuleRow {
                        name: id.to_string(),
                        version: manifest.version.clone(),
                        state: state.to_string(),
                        requires: manifest
                            .requires
                            .iter()
                            .map(|m| m.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                        exports: manifest.exports.len().to_string(),
                    }
                })
                .collect();
            if !rows.is_empty() {
                println!("{}", ui::module_table(&rows));
            }

            ui::success(&format!(
                "{} module(s) loaded, {} failed",
                report.loaded.len(),
                report.failed.len()
            ));
        }

        Commands::Validate { dir } => {
            println!("{} Validating modules in {:?}", Icons::MAG, dir);
            let (_, report) = load_host(&dir)?;
            for id in &report.loaded {
                println!("{} {}", Icons::CHECK, id);
            }
            for (name, reason) in &report.failed {
                println!("{} {}: {}", Icons::CROSS, name, reason);
            }
            if report.failed.is_empty() {
                ui::success("All modules valid");
            } else {
                anyhow::bail!("{} module(s) failed validation", report.failed.len());
            }
        }

        Commands::List { dir } => {
            let (host, report) = load_host(&dir)?;
            report_failures(&report);

            let rows: Vec<ModuleRow> = host
                .modules()
                .filter_map(|id| host.manifest(id).map(|m| (id, m)))
                .map(|(id, manifest)| ModuleRow {
                    name: id.to_string(),
                    version: manifest.version.clone(),
                    state: "loaded".to_string(),
                    requires: manifest
                        .requires
                        .iter()
                        .map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    exports: manifest.exports.len().to_string(),
                })
                .collect();

            if rows.is_empty() {
                println!("∅ No modules loaded.");
            } else {
                println!("{}", ui::module_table(&rows));
            }
        }

        Commands::Deps { module, dir, include_self, format } => {
            let (host, _) = load_host(&dir)?;
            let id = parse_module(&module)?;

            println!("{} Dependencies of {} (include_self: {})", Icons::DOWN, module, include_self);
            let deps = host.graph().transitive_dependencies(&id, include_self)?;
            print_modules(&deps, &format)?;
        }

        Commands::Dependents { module, dir, include_self, format } => {
            let (host, _) = load_host(&dir)?;
            let id = parse_module(&module)?;

            println!("{} Dependents of {} (include_self: {})", Icons::UP, module, include_self);
            let dependents = host.graph().transitive_dependents(&id, include_self)?;
            print_modules(&dependents, &format)?;
        }

        Commands::Resolve { module, symbol, dir, format } => {
            let (host, _) = load_host(&dir)?;
            let id = parse_module(&module)?;

            println!("{} Resolving '{}' from {}", Icons::LINK, symbol, module);
            let resolution = host.resolve(&id, &symbol)?;

            if format == "json" {
                match resolution.found() {
                    Some(export) => println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "found": true,
                            "export": export,
                        }))?
                    ),
                    None => println!("{}", serde_json::json!({ "found": false })),
                }
            } else {
                match resolution.found() {
                    Some(export) => {
                        println!(
                            "{} [{}] {} (provided by {})",
                            Icons::CHECK, export.kind, export.name, export.provider
                        );
                    }
                    None => println!("∅ Symbol not found."),
                }
            }
        }

        Commands::Order { dir, format } => {
            let (host, report) = load_host(&dir)?;
            report_failures(&report);

            println!("{} Load order:", Icons::GEAR);
            let order = host.graph().load_order();
            print_modules(&order, &format)?;
        }

        Commands::UnloadOrder { module, dir } => {
            let (host, _) = load_host(&dir)?;
            let id = parse_module(&module)?;

            println!("{} Safe unload order for {}:", Icons::DEL, module);
            let order = host.unload_order(&id)?;
            print_modules(&order, "text")?;
        }

        Commands::Stats { dir } => {
            let (host, report) = load_host(&dir)?;
            report_failures(&report);

            println!("{} Modhost Statistics ({:?})", Icons::STATS, dir);
            println!("------------------------------------");
            println!("{}", host.stats());
        }

        Commands::Serve { dir, port } => {
            let (host, report) = load_host(&dir)?;
            report_failures(&report);
            ui::info("Modules", &host.graph().len().to_string());

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(modhost::server::start_server(port, host))?;
        }

        Commands::Watch { dir } => {
            let (host, report) = load_host(&dir)?;
            report_failures(&report);
            ui::info("Modules", &host.graph().len().to_string());

            let watcher = modhost::watcher::Watcher::new(dir, host);
            watcher.run()?;
        }
    }

    Ok(())
}
