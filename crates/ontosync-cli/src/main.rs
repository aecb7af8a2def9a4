//! Ontosync CLI
//!
//! - `diff`: plan the store operations between two Turtle snapshots
//! - `apply`: plan and execute them against a local store file
//! - `registry`: inspect or reset the identifier → entity-id registry

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use ontosync_registry::{EntityRegistry, JsonFileRegistry};
use ontosync_sync::{
    InMemoryWikibase, OntologySynchronizer, SyncConfig, SyncOperation, SyncPlan, SyncReport,
    SyncWorker, WikibaseAdapter,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ontosync")]
#[command(author, version, about = "Keep a Wikibase in sync with RDF ontology files")]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the operations that turn OLD into NEW.
    Diff {
        old: PathBuf,
        new: PathBuf,
        /// Skip property/range classification.
        #[arg(long)]
        no_annotate: bool,
        /// Group operations per subject.
        #[arg(long)]
        optimize: bool,
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Plan and execute the changes from OLD to NEW against a local store.
    Apply {
        old: PathBuf,
        new: PathBuf,
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Store snapshot, created if missing.
        #[arg(long, default_value = "store.json")]
        store: PathBuf,
        /// Registry file (overrides the configured path).
        #[arg(long)]
        registry: Option<PathBuf>,
        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Entity registry maintenance.
    Registry {
        #[command(subcommand)]
        command: RegistryCommands,
    },
}

#[derive(Subcommand)]
enum RegistryCommands {
    /// List identifier → entity-id mappings.
    Show {
        #[arg(long)]
        registry: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Forget every mapping.
    Reset {
        #[arg(long)]
        registry: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Diff {
            old,
            new,
            no_annotate,
            optimize,
            json,
        } => cmd_diff(&old, &new, !no_annotate, optimize, json),
        Commands::Apply {
            old,
            new,
            config,
            store,
            registry,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let registry = registry.unwrap_or_else(|| config.registry_path.clone());
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|e| anyhow!("failed to initialize tokio runtime: {e}"))?;
            rt.block_on(cmd_apply(&old, &new, config, &store, &registry, json))
        }
        Commands::Registry { command } => match command {
            RegistryCommands::Show { registry, config } => {
                cmd_registry_show(&registry_path(registry, config.as_deref())?)
            }
            RegistryCommands::Reset { registry, config } => {
                cmd_registry_reset(&registry_path(registry, config.as_deref())?)
            }
        },
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,ontosync=debug"
    } else {
        "warn,ontosync=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    match path {
        Some(path) => SyncConfig::load(path),
        None => Ok(SyncConfig::default()),
    }
}

fn registry_path(explicit: Option<PathBuf>, config: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(load_config(config)?.registry_path),
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn plan(synchronizer: &OntologySynchronizer, old: &Path, new: &Path) -> Result<SyncPlan> {
    let source = read(old)?;
    let target = read(new)?;
    synchronizer
        .synchronize(&source, &target)
        .with_context(|| format!("cannot diff {} against {}", old.display(), new.display()))
}

fn cmd_diff(old: &Path, new: &Path, annotate: bool, optimize: bool, json: bool) -> Result<()> {
    let synchronizer = OntologySynchronizer::new()
        .with_annotation(annotate)
        .with_optimization(optimize);
    let plan = plan(&synchronizer, old, new)?;

    if json {
        let skipped: Vec<String> = plan.skipped.iter().map(|s| s.to_string()).collect();
        let out = serde_json::json!({
            "operations": plan.operations,
            "skipped": skipped,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if plan.is_empty() {
        println!("{}", "No changes.".green());
        return Ok(());
    }
    for operation in &plan.operations {
        print_operation(operation);
    }
    print_skipped(&plan);
    println!(
        "{} operation(s), {} skipped",
        plan.operations.len(),
        plan.skipped.len()
    );
    Ok(())
}

async fn cmd_apply(
    old: &Path,
    new: &Path,
    config: SyncConfig,
    store_path: &Path,
    registry_path: &Path,
    json: bool,
) -> Result<()> {
    let synchronizer = OntologySynchronizer::from_config(&config);
    let plan = plan(&synchronizer, old, new)?;
    print_skipped(&plan);

    let store = Arc::new(InMemoryWikibase::load(store_path)?);
    let registry = JsonFileRegistry::open(registry_path)?;
    let adapter = WikibaseAdapter::new(store.clone(), registry, config);

    let (handle, worker) = SyncWorker::spawn(adapter);
    let report = handle.submit(plan.operations.clone()).await?;
    drop(handle);
    worker.await.context("sync worker panicked")?;

    store.save(store_path)?;
    tracing::debug!(
        path = %store_path.display(),
        entities = store.entity_count(),
        "saved store"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&plan.operations, &report);
    }
    if report.all_successful() {
        Ok(())
    } else {
        Err(anyhow!("{} of {} operation(s) failed", report.failed(), report.results.len()))
    }
}

fn cmd_registry_show(path: &Path) -> Result<()> {
    let registry = JsonFileRegistry::open(path)?;
    if registry.is_empty() {
        println!("{}", format!("{} is empty", path.display()).dimmed());
        return Ok(());
    }
    for (identifier, entity_id) in registry.entries() {
        println!("{}  {}", entity_id.cyan(), identifier);
    }
    Ok(())
}

fn cmd_registry_reset(path: &Path) -> Result<()> {
    let mut registry = JsonFileRegistry::open(path)?;
    let forgotten = registry.len();
    registry.reset()?;
    println!("Reset {} ({} mapping(s) removed)", path.display(), forgotten);
    Ok(())
}

fn print_operation(operation: &SyncOperation) {
    let line = operation.to_string();
    match operation {
        SyncOperation::Addition { .. } => println!("{}", line.green()),
        SyncOperation::Removal { .. } => println!("{}", line.red()),
        SyncOperation::Batch(_) => println!("{}", line.yellow()),
    }
}

fn print_skipped(plan: &SyncPlan) {
    for skipped in &plan.skipped {
        eprintln!("{} {}", "skipped".yellow(), skipped);
    }
}

fn print_report(operations: &[SyncOperation], report: &SyncReport) {
    for (operation, result) in operations.iter().zip(&report.results) {
        if result.successful {
            println!("{} {}", "ok    ".green(), operation);
        } else {
            println!("{} {}\n       {}", "FAILED".red().bold(), operation, result.message);
        }
    }
    println!(
        "{} succeeded, {} failed",
        report.succeeded().to_string().green(),
        report.failed().to_string().red()
    );
}
