use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hyprdrive_core::{DaemonClient, DaemonConfig};

mod commands;

#[derive(Parser)]
#[command(name = "hyprdrive")]
#[command(author, version, about = "Run configured desktop actions through the hyprdrive daemon")]
#[command(after_help = "Examples:
  hyprdrive apps browser
  hyprdrive actions volume-up
  hyprdrive apps terminal -e htop
  hyprdrive list
  hyprdrive kill 12345")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List processes started by the daemon
    List,
    /// Terminate a process started by the daemon
    Kill {
        /// PID as shown by `hyprdrive list`
        pid: u32,
    },
    /// Re-read the action configuration
    Reload,
    /// Show daemon status
    Status,
    /// Run or control the daemon
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// Run an action: <section> <key> [args...]
    #[command(external_subcommand)]
    Action(Vec<String>),
}

#[derive(Subcommand)]
enum DaemonAction {
    /// Start the daemon in the foreground
    Start {
        /// Action file to use instead of the search path
        #[arg(short, long)]
        actions: Option<PathBuf>,
    },
    /// Stop the running daemon
    Stop,
    /// Check whether the daemon is running
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = DaemonConfig::load()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let client = DaemonClient::new(config.socket_path()).with_timeout(config.timeout());

    match cli.command {
        Commands::List => commands::list::run(&client).await,
        Commands::Kill { pid } => commands::kill::run(&client, pid).await,
        Commands::Reload => commands::reload::run(&client).await,
        Commands::Status => commands::status::run(&client).await,
        Commands::Daemon { action } => match action {
            DaemonAction::Start { actions } => commands::daemon::start(config, actions).await,
            DaemonAction::Stop => commands::daemon::stop().await,
            DaemonAction::Status => commands::daemon::status(&client).await,
        },
        Commands::Action(words) => commands::action::run(&client, &words).await,
    }
}
