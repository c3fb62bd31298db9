//! ldapdb CLI - run directory operations against a snapshot
//!
//! Each invocation performs one backend operation. Any number of
//! invocations may run at once against the same snapshot; in `file` mode
//! they coordinate exactly like separate server worker processes.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use ldapdb_backend::{Backend, Filter, Modification, SearchResults, open_backend};
use ldapdb_common::config::BackendMode;
use ldapdb_common::{Config, Dn, Scope};
use ldapdb_store::{Attributes, DirectoryStore, Entry};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "ldapdb")]
#[command(about = "ldapdb directory CLI")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "ldapdb.toml")]
    config: PathBuf,

    /// Snapshot file (overrides config)
    #[arg(long, env = "LDAPDB_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Lock file (overrides config)
    #[arg(long)]
    lock: Option<PathBuf>,

    /// Backend mode (overrides config)
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Memory,
    File,
}

impl From<Mode> for BackendMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Memory => Self::Memory,
            Mode::File => Self::File,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search entries and print them as LDIF
    Search {
        /// Base DN
        base: String,
        /// Scope: base, one or sub
        #[arg(short, long, default_value = "sub")]
        scope: Scope,
        /// Filter term (attr=value, attr=*, !attr=value); repeat to AND
        #[arg(short, long)]
        filter: Vec<Filter>,
    },
    /// Add an entry
    Add {
        /// DN of the new entry
        dn: String,
        /// Attribute values as attr=value
        attributes: Vec<String>,
    },
    /// Delete an entry
    Delete {
        /// DN of the entry
        dn: String,
    },
    /// Modify an entry
    Modify {
        /// DN of the entry
        dn: String,
        /// Change as add:attr=value, delete:attr[=value] or replace:attr[=value]
        #[arg(short, long = "change", required = true)]
        changes: Vec<String>,
    },
    /// Print the whole snapshot as JSON
    Dump,
}

fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
}

fn parse_attributes(pairs: &[String]) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    for pair in pairs {
        let Some((attr, value)) = pair.split_once('=') else {
            bail!("expected attr=value, got {pair:?}");
        };
        attributes
            .entry(attr.to_string())
            .or_default()
            .push(value.to_string());
    }
    Ok(attributes)
}

/// Parse `op:attr[=value]` arguments, merging consecutive ones that share
/// operation and attribute into a single change
fn parse_changes(args: &[String]) -> Result<Vec<Modification>> {
    let mut parsed: Vec<(String, String, Vec<String>)> = Vec::new();
    for arg in args {
        let Some((op, rest)) = arg.split_once(':') else {
            bail!("expected op:attr[=value], got {arg:?}");
        };
        let (attr, value) = match rest.split_once('=') {
            Some((attr, value)) => (attr, Some(value)),
            None => (rest, None),
        };
        match parsed.last_mut() {
            Some((last_op, last_attr, values)) if last_op == op && last_attr == attr => {
                values.extend(value.map(str::to_string));
            }
            _ => parsed.push((
                op.to_string(),
                attr.to_string(),
                value.map(str::to_string).into_iter().collect(),
            )),
        }
    }

    parsed
        .into_iter()
        .map(|(op, attr, values)| match op.as_str() {
            "add" => Ok(Modification::Add { attr, values }),
            "delete" => Ok(Modification::Delete { attr, values }),
            "replace" => Ok(Modification::Replace { attr, values }),
            other => bail!("unknown modify operation {other:?}"),
        })
        .collect()
}

fn print_ldif(dn: &Dn, entry: &Entry) {
    println!("dn: {dn}");
    for (attr, values) in entry.iter() {
        for value in values {
            println!("{attr}: {value}");
        }
    }
    println!();
}

async fn run(backend: &dyn Backend, config: &Config, command: Commands) -> ldapdb_common::Result<()> {
    match command {
        Commands::Search {
            base,
            scope,
            filter,
        } => {
            let mut results = SearchResults::new();
            backend
                .search(&base, scope, &Filter::all(filter), &mut results)
                .await?;
            for (dn, entry) in results.entries() {
                print_ldif(dn, entry);
            }
            info!("{} entries returned", results.len());
        }
        Commands::Add { dn, attributes } => {
            let attributes = parse_attributes(&attributes)
                .map_err(|e| ldapdb_common::Error::unwilling_to_perform(e.to_string()))?;
            backend.add(&dn, attributes).await?;
        }
        Commands::Delete { dn } => backend.delete(&dn).await?,
        Commands::Modify { dn, changes } => {
            let changes = parse_changes(&changes)
                .map_err(|e| ldapdb_common::Error::unwilling_to_perform(e.to_string()))?;
            backend.modify(&dn, changes).await?;
        }
        Commands::Dump => {
            let store = DirectoryStore::open(&config.backend.snapshot_path)?;
            let json = serde_json::to_string_pretty(store.directory())
                .map_err(|e| ldapdb_common::Error::Snapshot(e.to_string()))?;
            println!("{json}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Merge CLI args with config file (CLI takes precedence)
    let mut config = load_config(&args.config)?;
    if let Some(snapshot) = args.snapshot {
        config.backend.snapshot_path = snapshot;
    }
    if let Some(lock) = args.lock {
        config.backend.lock_path = Some(lock);
    }
    if let Some(mode) = args.mode {
        config.backend.mode = mode.into();
    }
    let log_level = args.log_level.unwrap_or_else(|| config.logging.level.clone());

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("Config: {:?}", config);
    let backend = open_backend(&config.backend)?;
    info!(
        "Using {} backend on {}",
        backend.name(),
        config.backend.snapshot_path.display()
    );

    let outcome = run(backend.as_ref(), &config, args.command).await;
    backend.shutdown().await?;

    if let Err(e) = outcome {
        eprintln!("Error: {e} (result code {})", e.result_code());
        std::process::exit(1);
    }
    Ok(())
}
