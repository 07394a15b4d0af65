//! TomeDB CLI
//!
//! Command-line tools for TomeDB data directories and versions.
//!
//! # Commands
//!
//! - `inspect` - Display engine statistics after a full log replay
//! - `dump-log` - Dump log entries for debugging
//! - `versions` - List version names
//! - `version-info` - Show a version's metadata
//! - `snapshot` - Create a version from the current record set
//! - `delete-version` - Delete a version
//! - `restore` - Restore a version into a fresh data directory

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when `--api-key` is not given.
const API_KEY_ENV: &str = "TOMEDB_API_KEY";

/// TomeDB command-line database tools.
#[derive(Parser)]
#[command(name = "tomedb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// API key (falls back to TOMEDB_API_KEY, then empty)
    #[arg(global = true, short = 'k', long)]
    api_key: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display engine statistics after a full log replay
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Dump log entries for debugging
    DumpLog {
        /// Chunk base name the directory was written with
        #[arg(short, long, default_value = "data")]
        base: String,

        /// Maximum number of entries to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Skip this many entries first
        #[arg(short, long, default_value = "0")]
        offset: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List version names
    Versions {
        /// Base directory holding the versions
        #[arg(long)]
        versions_dir: PathBuf,
    },

    /// Show a version's metadata
    VersionInfo {
        /// Base directory holding the versions
        #[arg(long)]
        versions_dir: PathBuf,

        /// Version name
        name: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Create a version from the current record set
    Snapshot {
        /// Base directory holding the versions
        #[arg(long)]
        versions_dir: PathBuf,

        /// Version name
        name: String,

        /// Entries per snapshot chunk file
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Create the version empty instead of snapshotting an engine
        #[arg(long)]
        empty: bool,
    },

    /// Delete a version
    DeleteVersion {
        /// Base directory holding the versions
        #[arg(long)]
        versions_dir: PathBuf,

        /// Version name
        name: String,
    },

    /// Restore a version into a fresh data directory
    Restore {
        /// Base directory holding the versions
        #[arg(long)]
        versions_dir: PathBuf,

        /// Version name
        name: String,

        /// Target data directory for the restored engine
        #[arg(long)]
        target: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let key = cli
        .api_key
        .or_else(|| std::env::var(API_KEY_ENV).ok())
        .unwrap_or_default();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Data directory path required for inspect")?;
            commands::inspect::run(&path, &key, &format)?;
        }
        Commands::DumpLog {
            base,
            limit,
            offset,
            format,
        } => {
            let path = cli.path.ok_or("Data directory path required for dump-log")?;
            commands::dump_log::run(&path, &base, limit, offset, &format)?;
        }
        Commands::Versions { versions_dir } => {
            commands::versions::run(&versions_dir)?;
        }
        Commands::VersionInfo {
            versions_dir,
            name,
            format,
        } => {
            commands::version_info::run(&versions_dir, &name, &format)?;
        }
        Commands::Snapshot {
            versions_dir,
            name,
            chunk_size,
            empty,
        } => {
            let path = if empty { None } else { cli.path };
            commands::snapshot::run(&versions_dir, &name, path.as_deref(), &key, chunk_size, empty)?;
        }
        Commands::DeleteVersion { versions_dir, name } => {
            commands::delete_version::run(&versions_dir, &name)?;
        }
        Commands::Restore {
            versions_dir,
            name,
            target,
        } => {
            commands::restore::run(&versions_dir, &name, &target, &key)?;
        }
        Commands::Version => {
            println!("TomeDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("TomeDB Core v{}", tomedb_core::VERSION);
        }
    }

    Ok(())
}
