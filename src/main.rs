use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "aerie")]
#[command(about = "Adaptive remote-shell session engine with command intelligence")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.aerie/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open an interactive session to user@host
    Connect {
        /// Destination as user@host
        destination: String,

        /// SSH port
        #[arg(short, long, default_value_t = 22)]
        port: u16,

        /// Authenticate with a password (prompted on stdin)
        #[arg(long)]
        password: bool,

        /// Authenticate with a private key file
        #[arg(long)]
        key: Option<PathBuf>,
    },

    /// Query learned command suggestions from the ledger
    Suggest {
        /// Exact context bucket to rank within
        #[arg(long)]
        context: Option<String>,

        /// Rank commands starting with this prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Maximum number of suggestions
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Purge ledger rows unused past the retention window
    Cleanup {
        /// Override the configured retention window (days)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Initialize a default ~/.aerie/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config_path = args
        .config
        .unwrap_or_else(aerie::config::Settings::config_path);
    let settings = aerie::config::Settings::load(&config_path)?;

    match args.command {
        Commands::Connect {
            destination,
            port,
            password,
            key,
        } => {
            cli::connect::connect_command(settings, &destination, port, password, key).await?;
        }
        Commands::Suggest {
            context,
            prefix,
            limit,
        } => {
            cli::suggest::suggest_command(settings, context, prefix, limit)?;
        }
        Commands::Cleanup { days } => {
            cli::cleanup::cleanup_command(settings, days)?;
        }
        Commands::Init { force } => {
            cli::init::init_command(&config_path, force)?;
        }
    }

    Ok(())
}
