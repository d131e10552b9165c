//! LiftLog CLI - command-line client for the workout tracking service.

mod commands;

use anyhow::Result;
use auth_engine::{HttpAuthClient, SessionManager};
use clap::{Parser, Subcommand};
use liftlog_core::{Config, Paths, SystemClock};
use liftlog_storage::{FileStorage, SessionStore};
use std::sync::Arc;

/// LiftLog CLI for account and session management.
#[derive(Parser)]
#[command(name = "liftlog")]
#[command(about = "LiftLog client for the workout tracking service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Override the service base URL
    #[arg(long, env = "LIFTLOG_SERVER_URL", global = true)]
    server_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with username and password
    Login,

    /// Logout and clear the stored session
    Logout,

    /// Show session status
    Status,

    /// Show the logged-in user's profile
    Whoami,

    /// Create a new account
    Register,

    /// Delete the account and clear the session
    DeleteAccount,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    liftlog_core::init_logging(&cli.log_level);

    let paths = Paths::new()?;
    let mut config = Config::load(&paths)?;
    if let Some(server_url) = cli.server_url {
        config.server_url = server_url;
    }
    tracing::debug!(server_url = %config.server_url, "Client configured");

    let storage = FileStorage::open(paths.session_file())?;
    let manager = SessionManager::new(
        SessionStore::new(Box::new(storage)),
        Arc::new(HttpAuthClient::new(config.server_url.clone())),
        Arc::new(SystemClock),
    );

    match cli.command {
        Commands::Login => commands::login(&manager).await,
        Commands::Logout => commands::logout(&manager).await,
        Commands::Status => commands::status(&manager).await,
        Commands::Whoami => commands::whoami(&manager).await,
        Commands::Register => commands::register(&manager).await,
        Commands::DeleteAccount => commands::delete_account(&manager).await,
    }
}
