//! # configs
//!
//! Layered settings: `config/default.toml`, then `BLOG__`-prefixed
//! environment variables (after loading `.env`). Secrets are typed as
//! `SecretString` so they never land in debug output or logs.
//!
//! Feature flags mirror the adapter features so a binary compiled
//! without, say, Redis never even parses a cache URL.

use serde::Deserialize;
use thiserror::Error;

#[cfg(any(feature = "db-postgres", feature = "auth-jwt"))]
use secrecy::SecretString;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub cache: Cache,
    #[cfg(feature = "db-postgres")]
    pub database: Database,
    #[cfg(feature = "auth-jwt")]
    pub auth: Auth,
    #[cfg(feature = "media-local")]
    #[serde(default)]
    pub media: Media,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Log {
    /// JSON lines instead of the human-readable format.
    pub json: bool,
    /// Fallback filter when RUST_LOG is unset.
    pub filter: String,
}

impl Default for Log {
    fn default() -> Self {
        Self { json: false, filter: "info".into() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Cache {
    /// Home-page cache window, in seconds.
    pub ttl_seconds: u64,
    #[cfg(feature = "redis")]
    pub url: String,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            ttl_seconds: 20,
            #[cfg(feature = "redis")]
            url: "redis://127.0.0.1:6379".into(),
        }
    }
}

#[cfg(feature = "db-postgres")]
#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub url: SecretString,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[cfg(feature = "db-postgres")]
fn default_max_connections() -> u32 {
    8
}

#[cfg(feature = "auth-jwt")]
#[derive(Debug, Clone, Deserialize)]
pub struct Auth {
    pub jwt_secret: SecretString,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

#[cfg(feature = "auth-jwt")]
fn default_session_ttl_hours() -> i64 {
    72
}

#[cfg(feature = "media-local")]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Media {
    pub root: String,
    pub url_prefix: String,
}

#[cfg(feature = "media-local")]
impl Default for Media {
    fn default() -> Self {
        Self { root: "./data/media".into(), url_prefix: "/media".into() }
    }
}

impl Settings {
    /// `config/default.toml` (optional) layered under `BLOG__*`
    /// environment overrides, e.g. `BLOG__SERVER__PORT=9000`.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("BLOG")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}
