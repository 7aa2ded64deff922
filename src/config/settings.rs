//! Application settings
//!
//! Layered lowest to highest: built-in defaults, `settings.toml`, `MOODLIST_*`
//! environment variables, then `SUPABASE_URL` / `SUPABASE_KEY`.

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat, Map};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::utils::auth::generate_random_string;

const DEFAULT_SALT: &str = "moodlist";
const JWT_SECRET_LENGTH: usize = 48;

/// Where the catalog lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// hosted REST store with its auth service
    Rest,
    /// local SQLite file with local accounts
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// unset picks `rest` when a store URL is configured
    #[serde(default)]
    pub backend: Option<Backend>,
    #[serde(default)]
    pub store_url: Option<String>,
    #[serde(default)]
    pub store_key: Option<String>,
    pub database_path: PathBuf,
    pub request_timeout_secs: u64,
    /// mixed into every local password hash
    pub password_salt: String,
    #[serde(default)]
    pub jwt_secret: Option<String>,
    pub session_ttl_secs: u64,
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "moodlist")
}

/// Default location of `settings.toml`
fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("settings.toml"))
}

fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("moodlist.db"))
        .unwrap_or_else(|| PathBuf::from("moodlist.db"))
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

impl Settings {
    /// Load settings from the process environment, honouring a `.env` file
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(err) if err.not_found() => {}
            Err(err) => warn!("Ignoring unreadable .env file: {}", err),
        }

        Self::from_sources(config_file, std::env::vars().collect())
    }

    /// Load settings from an explicit environment map
    pub fn from_sources(config_file: Option<&Path>, env: Map<String, String>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("database_path", default_database_path().to_string_lossy().to_string())?
            .set_default("request_timeout_secs", 30)?
            .set_default("password_salt", DEFAULT_SALT)?
            .set_default("session_ttl_secs", 24 * 3600)?;

        match config_file {
            Some(path) => {
                debug!("Reading settings from {}", path.display());
                builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
            }
            None => {
                if let Some(path) = default_config_file() {
                    builder = builder
                        .add_source(File::from(path.as_path()).format(FileFormat::Toml).required(false));
                }
            }
        }

        let supabase_url = non_empty(env.get("SUPABASE_URL"));
        let supabase_key = non_empty(env.get("SUPABASE_KEY"));

        let config = builder
            .add_source(
                Environment::with_prefix("MOODLIST")
                    .prefix_separator("_")
                    .try_parsing(true)
                    .source(Some(env)),
            )
            .set_override_option("store_url", supabase_url)?
            .set_override_option("store_key", supabase_key)?
            .build()
            .context("Failed to read settings")?;

        let mut settings: Settings = config
            .try_deserialize()
            .context("Invalid settings")?;

        if settings.jwt_secret.as_deref().map_or(true, str::is_empty) {
            settings.jwt_secret = Some(generate_random_string(JWT_SECRET_LENGTH));
        }
        if settings.password_salt == DEFAULT_SALT {
            warn!("Using the built-in password salt; set MOODLIST_PASSWORD_SALT");
        }

        Ok(settings)
    }

    /// The backend to run against
    pub fn backend(&self) -> Backend {
        self.backend.unwrap_or(if self.store_url.is_some() {
            Backend::Rest
        } else {
            Backend::Sqlite
        })
    }

    /// URL and key of the hosted store
    pub fn remote(&self) -> Result<(&str, &str)> {
        let url = self
            .store_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .context("The rest backend needs a store URL (SUPABASE_URL or MOODLIST_STORE_URL)")?;
        let key = self
            .store_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .context("The rest backend needs a store key (SUPABASE_KEY or MOODLIST_STORE_KEY)")?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("Store URL must start with http:// or https://, got '{}'", url);
        }
        Ok((url, key))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn jwt_secret(&self) -> &str {
        self.jwt_secret.as_deref().unwrap_or_default()
    }
}
