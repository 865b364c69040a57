//! QuizStore CLI
//!
//! Maintenance tools for an on-disk QuizStore installation.
//!
//! # Commands
//!
//! - `info` - Show the selected backend, migration result and counts
//! - `get` / `set` / `remove` / `list` - Record access
//! - `backup` - Create, list, restore and rotate backups
//! - `health` - Capacity estimate and health status
//! - `export` - Write all canonical records to a JSON file
//! - `reset` - Remove all data

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// QuizStore command-line maintenance tools.
#[derive(Parser)]
#[command(name = "quizstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Installation directory (holds flat.json and structured/)
    #[arg(global = true, short, long, default_value = ".")]
    dir: PathBuf,

    /// Skip structured storage and use the flat file only
    #[arg(global = true, long)]
    flat_only: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show backend, migration and collection information
    Info,

    /// Print one record's payload
    Get {
        /// Collection (quizData, userProgress, settings, backup)
        collection: String,
        /// Record id
        id: String,
    },

    /// Write one record from a JSON string
    Set {
        /// Collection (quizData, userProgress, settings)
        collection: String,
        /// Record id
        id: String,
        /// Payload as JSON
        json: String,
    },

    /// Remove one record
    Remove {
        /// Collection
        collection: String,
        /// Record id
        id: String,
    },

    /// List the records of a collection
    List {
        /// Collection
        collection: String,
    },

    /// Manage backups
    Backup {
        #[command(subcommand)]
        action: BackupCommands,
    },

    /// Show capacity and health status
    Health {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Export all canonical records to a JSON file
    Export {
        /// Output file
        output: PathBuf,
    },

    /// Remove all data and clear the migration flag
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Back up the question bank and progress
    Create {
        /// Backup name (defaults to backup_<timestamp>)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List backups, newest first
    List,

    /// Restore live data from a backup
    Restore {
        /// Backup id
        id: String,
    },

    /// Delete all but the newest backups
    Cleanup {
        /// Number of backups to keep
        #[arg(short, long, default_value = "10")]
        keep: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("QuizStore CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if let Commands::Reset { yes } = cli.command {
        commands::reset::confirm(yes)?;
    }

    let store = commands::open_store(&cli.dir, cli.flat_only).await?;

    match cli.command {
        Commands::Info => commands::info::run(&store, &cli.dir).await?,
        Commands::Get { collection, id } => commands::data::get(&store, &collection, &id).await?,
        Commands::Set {
            collection,
            id,
            json,
        } => commands::data::set(&store, &collection, &id, &json).await?,
        Commands::Remove { collection, id } => {
            commands::data::remove(&store, &collection, &id).await?;
        }
        Commands::List { collection } => commands::data::list(&store, &collection).await?,
        Commands::Backup { action } => match action {
            BackupCommands::Create { name } => {
                commands::backup::create(&store, name.as_deref()).await?;
            }
            BackupCommands::List => commands::backup::list(&store).await?,
            BackupCommands::Restore { id } => commands::backup::restore(&store, &id).await?,
            BackupCommands::Cleanup { keep } => commands::backup::cleanup(&store, keep).await?,
        },
        Commands::Health { format } => commands::health::run(&store, &format).await?,
        Commands::Export { output } => commands::export::run(&store, &output).await?,
        Commands::Reset { .. } => commands::reset::run(&store).await?,
        Commands::Version => {}
    }

    Ok(())
}
