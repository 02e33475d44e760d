//! notedoc CLI
//!
//! Command-line interface for the notedoc note repository.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use notedoc_core::{Config, Database, NoteRepository};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "notedoc")]
#[command(about = "notedoc - Notes kept in a local document store")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use a config file other than the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List notes
    #[command(alias = "ls")]
    List {
        /// Page number, starting at 1
        #[arg(short, long)]
        page: Option<u64>,
        /// Notes per page (0 for no limit)
        #[arg(short, long)]
        limit: Option<u64>,
    },
    /// Show a note
    Show {
        /// Note ID (full hex id or prefix)
        id: String,
    },
    /// Create a new note
    #[command(alias = "add")]
    Create {
        /// Note title
        #[arg(short = 'T', long)]
        title: String,
        /// Note description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Replace a note's title and description
    Update {
        /// Note ID (full hex id or prefix)
        id: String,
        /// New title
        #[arg(short = 'T', long)]
        title: String,
        /// New description (use "" to clear it)
        #[arg(short, long)]
        description: String,
    },
    /// Delete a note
    #[command(alias = "rm")]
    Delete {
        /// Note ID (full hex id or prefix)
        id: String,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show store location and note count
    Status,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, operation_timeout_secs, cursor_batch_size, log_level, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())?;
    init_logging(&config);

    let db = Database::open(&config)?;
    debug!(path = ?config.store_path(), "Opened document store");
    let repo = NoteRepository::from_database(&db, &config);

    match cli.command {
        Commands::List { page, limit } => commands::note::list(&repo, page, limit, &output).await,
        Commands::Show { id } => commands::note::show(&repo, id, &output).await,
        Commands::Create { title, description } => {
            commands::note::create(&repo, title, description, &output).await
        }
        Commands::Update {
            id,
            title,
            description,
        } => commands::note::update(&repo, id, title, description, &output).await,
        Commands::Delete { id } => commands::note::delete(&repo, id, &output).await,
        Commands::Status => commands::status::show(&db, &config, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// RUST_LOG takes precedence over the configured level. Logs go to
/// config.log_file when set, otherwise to stderr.
fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "notedoc_core={},notedoc_cli={}",
            config.log_level, config.log_level
        ))
    });

    match &config.log_file {
        Some(log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };

            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
