//! ContactDB CLI
//!
//! Maintenance tools for a ContactDB data directory.
//!
//! # Commands
//!
//! - `inspect` - Show snapshot and WAL metadata without replaying
//! - `list` - Print every contact
//! - `verify` - Check both indexes against the records
//! - `checkpoint` - Write a snapshot and clear the WAL
//! - `dump-wal` - Print pending WAL entries

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ContactDB command-line tools.
#[derive(Parser)]
#[command(name = "contactdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show snapshot and WAL metadata
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print every contact
    List {
        /// Order by the first letter of the name
        #[arg(short, long)]
        sorted: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check both indexes against the records
    Verify {
        /// Rebuild the indexes if they disagree with the records
        #[arg(short, long)]
        repair: bool,
    },

    /// Write a snapshot and clear the WAL
    Checkpoint,

    /// Print pending WAL entries
    DumpWal {
        /// Maximum number of entries to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Data directory path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::List { sorted, format } => {
            let path = cli.path.ok_or("Data directory path required for list")?;
            commands::list::run(&path, sorted, &format)?;
        }
        Commands::Verify { repair } => {
            let path = cli.path.ok_or("Data directory path required for verify")?;
            commands::verify::run(&path, repair)?;
        }
        Commands::Checkpoint => {
            let path = cli.path.ok_or("Data directory path required for checkpoint")?;
            commands::checkpoint::run(&path)?;
        }
        Commands::DumpWal { limit, format } => {
            let path = cli.path.ok_or("Data directory path required for dump-wal")?;
            commands::dump_wal::run(&path, limit, &format)?;
        }
        Commands::Version => {
            println!("ContactDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("ContactDB Core v{}", contactdb_core::VERSION);
        }
    }

    Ok(())
}
