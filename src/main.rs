//! moodlist - a mood-based playlist manager
//!
//! Users, moods, songs, artists and playlists live in a managed relational
//! store reached over REST, or in a local SQLite file.

mod auth;
mod config;
mod core;
mod db;
mod models;
mod ui;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::auth::{GoTrueClient, IdentityProvider, LocalIdentity};
use crate::config::{Backend, Settings};
use crate::db::{Catalog, RestStore, SharedStore, SqliteStore};
use crate::ui::Console;

/// moodlist - organise playlists by mood
#[derive(Parser, Debug)]
#[command(name = "moodlist")]
#[command(version)]
#[command(about = "A mood-based playlist manager")]
struct Args {
    /// Path to a settings.toml file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Override the configured backend
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Sign in and browse the catalog (default)
    App,
    /// Numbered management menus over every table
    Menu,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };

    // RUST_LOG wins; otherwise keep client libraries quiet
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "{},sqlx=warn,hyper=warn,reqwest=warn",
            log_level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("moodlist v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut settings = Settings::load(args.config.as_deref())?;
    if args.backend.is_some() {
        settings.backend = args.backend;
    }

    let (store, identity) = connect(&settings).await?;
    let catalog = Catalog::new(store);

    let stdin = std::io::stdin();
    let mut console = Console::new(stdin.lock(), std::io::stdout());

    match args.command.unwrap_or(Command::App) {
        Command::App => {
            ui::run_app(&mut console, &catalog, identity.as_ref(), &settings.password_salt).await?
        }
        Command::Menu => ui::main_menu(&mut console, &catalog, &settings.password_salt).await?,
    }

    info!("Goodbye");
    Ok(())
}

/// Build the store and identity provider for the configured backend
async fn connect(settings: &Settings) -> Result<(SharedStore, Box<dyn IdentityProvider>)> {
    match settings.backend() {
        Backend::Rest => {
            let (url, key) = settings.remote()?;
            info!("Using hosted store at {}", url);

            let store = RestStore::new(url, key, settings.request_timeout())
                .context("Failed to build the store client")?;
            let identity = GoTrueClient::new(url, key, settings.request_timeout())
                .context("Failed to build the auth client")?;
            Ok((Arc::new(store), Box::new(identity)))
        }
        Backend::Sqlite => {
            let store: SharedStore = Arc::new(
                SqliteStore::open(&settings.database_path)
                    .await
                    .with_context(|| {
                        format!("Failed to open {}", settings.database_path.display())
                    })?,
            );
            let identity = LocalIdentity::new(
                store.clone(),
                &settings.password_salt,
                settings.jwt_secret(),
                settings.session_ttl_secs,
            );
            Ok((store, Box::new(identity)))
        }
    }
}
