//! Configuration management

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub storage: StorageSettings,
    #[serde(default)]
    pub templates: TemplateSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
    /// Sessions never expire when unset.
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

impl SessionSettings {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub files_dir: PathBuf,
    pub max_file_size: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TemplateSettings {
    /// Directory with `*.hbs` files replacing the built-in templates.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl AppConfig {
    /// Defaults, then `config/default`, then `config/{APP_ENV}`, then `FILEHOST__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 10)?
            .set_default("session.cookie_secure", false)?
            .set_default("storage.files_dir", "files")?
            .set_default("storage.max_file_size", DEFAULT_MAX_FILE_SIZE as i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("FILEHOST")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        config.try_deserialize()
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
