//! Sieve CLI - Incremental document ingestion with an integrity ledger.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sieve - fingerprint, refine and track documents for retrieval pipelines
#[derive(Parser)]
#[command(name = "sieve")]
#[command(version)]
#[command(about = "Incremental document ingestion with an integrity ledger", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Sieve (create config and ledger)
    Init,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Print the content fingerprint of a file
    Hash {
        /// File to fingerprint
        path: String,

        /// Also show the ledger entry for the fingerprint
        #[arg(long)]
        check: bool,
    },

    /// Ingest files or directories, skipping content already ingested
    Ingest {
        /// Path to file or directory to ingest
        path: String,

        /// Collection name recorded in the ledger
        #[arg(short, long)]
        collection: Option<String>,

        /// Use the configured LLM provider for refinement
        #[arg(long, conflicts_with = "no_llm")]
        llm: bool,

        /// Use rule-based refinement only
        #[arg(long)]
        no_llm: bool,

        /// Show what would be ingested without actually ingesting
        #[arg(long)]
        dry_run: bool,
    },

    /// Preview chunk refinement for a file without touching the ledger
    Refine {
        /// File to load, split and refine
        path: String,

        /// Use the configured LLM provider
        #[arg(long)]
        llm: bool,

        /// Print units as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show ledger status
    Status,

    /// List failed ingestions
    Failed {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Remove ledger entries so content is ingested again
    Forget {
        /// Fingerprint or file path
        target: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., refiner.use_llm)
        key: String,

        /// Value to set
        value: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sieve=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sieve=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
        },
        Commands::Hash { path, check } => commands::hash::run(&path, check),
        Commands::Ingest {
            path,
            collection,
            llm,
            no_llm,
            dry_run,
        } => {
            let use_llm = match (llm, no_llm) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            commands::ingest::run(&path, collection.as_deref(), use_llm, dry_run)
        }
        Commands::Refine { path, llm, json } => commands::refine::run(&path, llm, json),
        Commands::Status => commands::status::run(),
        Commands::Failed { limit } => commands::failed::run(limit),
        Commands::Forget { target } => commands::forget::run(&target),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
