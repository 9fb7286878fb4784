//! # configs
//!
//! Layered settings: built-in defaults, then `config/default.toml` if it
//! exists, then `VERDESPACE__SECTION__KEY` environment variables (a `.env`
//! file is loaded into the environment first). Secrets are held as
//! [`SecretString`] and only exposed where an adapter is constructed.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const ENV_PREFIX: &str = "VERDESPACE";
pub const DEFAULT_FILE: &str = "config/default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub media: MediaSettings,
    #[serde(default)]
    pub notify: NotifySettings,
    pub comments: CommentSettings,
    pub log: LogSettings,
    #[serde(default)]
    pub bootstrap: BootstrapSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// Unset means the in-memory store.
    pub url: Option<SecretString>,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    Local,
    S3,
}

#[derive(Debug, Deserialize)]
pub struct MediaSettings {
    pub backend: MediaBackend,
    /// Filesystem root for the local backend.
    pub root: String,
    /// Public path prefix under which the local backend serves files.
    pub url_prefix: String,
    pub signing_key: SecretString,
    pub url_ttl_secs: u64,
    pub max_upload_bytes: usize,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotifySettings {
    pub telegram_token: Option<SecretString>,
    pub telegram_chat_id: Option<String>,
}

impl NotifySettings {
    /// Token and chat id, when both are configured.
    pub fn telegram(&self) -> Option<(&SecretString, &str)> {
        match (&self.telegram_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) if !chat.is_empty() => Some((token, chat.as_str())),
            _ => None,
        }
    }
}

/// Staff account created at startup when it does not exist yet.
#[derive(Debug, Default, Deserialize)]
pub struct BootstrapSettings {
    pub staff_email: Option<String>,
    pub staff_password: Option<SecretString>,
}

impl BootstrapSettings {
    pub fn staff(&self) -> Option<(&str, &SecretString)> {
        match (&self.staff_email, &self.staff_password) {
            (Some(email), Some(password)) if !email.is_empty() => Some((email.as_str(), password)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentSettings {
    pub max_depth: usize,
    pub replies_per_node: usize,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set.
    pub filter: String,
    pub json: bool,
}

impl Settings {
    /// Loads `.env`, the default file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ConfigError::Invalid(format!(".env: {e}"))),
        }
        let builder = defaults()?
            .add_source(File::with_name(DEFAULT_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));
        Self::build(builder)
    }

    /// Finishes a builder that already carries [`defaults`] and validates
    /// the result.
    pub fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.expose_secret().len() < 16 {
            return Err(ConfigError::Invalid(
                "auth.jwt_secret must be at least 16 bytes".into(),
            ));
        }
        if self.auth.token_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_minutes must be positive".into()));
        }
        match self.media.backend {
            MediaBackend::Local if self.media.signing_key.expose_secret().is_empty() => {
                return Err(ConfigError::Invalid(
                    "media.signing_key is required for the local backend".into(),
                ));
            }
            MediaBackend::S3 if self.media.s3_bucket.as_deref().is_none_or(str::is_empty) => {
                return Err(ConfigError::Invalid(
                    "media.s3_bucket is required for the s3 backend".into(),
                ));
            }
            _ => {}
        }
        if self.bootstrap.staff_email.is_some() != self.bootstrap.staff_password.is_some() {
            return Err(ConfigError::Invalid(
                "bootstrap.staff_email and bootstrap.staff_password go together".into(),
            ));
        }
        if self.comments.max_depth == 0 || self.comments.replies_per_node == 0 {
            return Err(ConfigError::Invalid("comment limits must be positive".into()));
        }
        Ok(())
    }
}

/// Built-in values for every key except the secrets.
pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8000)?
        .set_default("database.max_connections", 10)?
        .set_default("auth.token_ttl_minutes", 60 * 24)?
        .set_default("media.backend", "local")?
        .set_default("media.root", "./data/media")?
        .set_default("media.url_prefix", "/api/verdespace/media")?
        .set_default("media.url_ttl_secs", 3600)?
        .set_default("media.max_upload_bytes", 5 * 1024 * 1024)?
        .set_default("comments.max_depth", 16)?
        .set_default("comments.replies_per_node", 10)?
        .set_default("log.filter", "info")?
        .set_default("log.json", true)?)
}
