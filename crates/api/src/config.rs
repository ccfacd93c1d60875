//! Layered application configuration.
//!
//! Sources, later ones winning:
//! 1. `config/default.toml`, embedded at build time
//! 2. `config/default.toml` and `config/local.toml` on disk, both optional
//! 3. `EVENTLY__<SECTION>__<KEY>` environment variables

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use shared::jwt::{JwtConfig, JwtError};
use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

const EMBEDDED_DEFAULTS: &str = include_str!("../../../config/default.toml");
const ENV_PREFIX: &str = "EVENTLY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub jwt: JwtAuthConfig,
    pub registration: RegistrationConfig,
    pub email: EmailConfig,
    pub storage: StorageConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 20,
            min_connections: 5,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        }
    }
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,
    /// `json` or `pretty`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "json".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Upper bound on waiting for an event's row lock.
    pub lock_timeout_ms: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5000,
        }
    }
}

impl RegistrationConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Uploaded event images.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory images are written under, as `events/<uuid>.<ext>`.
    pub public_dir: String,
    /// URL path the directory is served from.
    pub public_url_prefix: String,
    pub max_image_kb: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_dir: "storage/public".into(),
            public_url_prefix: "/storage".into(),
            max_image_kb: 2048,
        }
    }
}

impl StorageConfig {
    pub fn max_image_bytes(&self) -> usize {
        usize::try_from(self.max_image_kb.saturating_mul(1024)).unwrap_or(usize::MAX)
    }

    /// Request body cap for event forms: one image plus room for the text fields.
    pub fn max_form_bytes(&self) -> usize {
        self.max_image_bytes().saturating_add(64 * 1024)
    }
}

/// Demo data loaded at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub demo_events: bool,
    /// Owner of the demo events; created when missing.
    pub owner_email: String,
    pub owner_name: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            demo_events: false,
            owner_email: "demo@evently.app".into(),
            owner_name: "Evently Demo".into(),
        }
    }
}

/// Token verification settings. Set `secret` for HS256, or `public_key`
/// (PEM) for RS256; the private key is only needed to mint tokens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtAuthConfig {
    pub secret: String,
    pub public_key: String,
    pub private_key: String,
    pub access_token_expiry_secs: i64,
    /// Clock skew tolerance.
    pub leeway_secs: u64,
}

impl Default for JwtAuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            public_key: String::new(),
            private_key: String::new(),
            access_token_expiry_secs: 3600,
            leeway_secs: 30,
        }
    }
}

impl JwtAuthConfig {
    /// Builds the token validator. RS256 wins when a public key is configured.
    pub fn build(&self) -> Result<JwtConfig, JwtError> {
        if self.public_key.is_empty() {
            return JwtConfig::from_secret(
                &self.secret,
                self.access_token_expiry_secs,
                self.leeway_secs,
            );
        }

        let private_key = Some(self.private_key.as_str()).filter(|k| !k.is_empty());
        JwtConfig::from_rsa_pem(
            private_key,
            &self.public_key,
            self.access_token_expiry_secs,
            self.leeway_secs,
        )
    }
}

/// Where outgoing mail goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    /// Log messages instead of sending them.
    #[default]
    Console,
    Smtp,
    Sendgrid,
}

impl EmailProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailProvider::Console => "console",
            EmailProvider::Smtp => "smtp",
            EmailProvider::Sendgrid => "sendgrid",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStyle {
    /// Plain text plus an HTML alternative.
    #[default]
    Html,
    Plain,
}

/// Registration email settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub provider: EmailProvider,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    /// Upgrade with STARTTLS. Off only for local relays such as MailHog.
    pub smtp_starttls: bool,
    pub sendgrid_api_key: String,
    /// From address.
    pub sender_email: String,
    pub sender_name: String,
    /// Prefix for links in messages, e.g. `https://events.example.com`.
    pub base_url: String,
    /// Used in the sign-off.
    pub app_name: String,
    pub template_style: TemplateStyle,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: EmailProvider::default(),
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_starttls: true,
            sendgrid_api_key: String::new(),
            sender_email: "noreply@evently.app".into(),
            sender_name: "Evently".into(),
            base_url: String::new(),
            app_name: "Evently".into(),
            template_style: TemplateStyle::default(),
        }
    }
}

impl Config {
    /// Loads and validates configuration from all sources.
    pub fn load() -> Result<Self, ConfigLoadError> {
        let cfg: Self = Self::sources()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Embedded defaults plus `overrides`, with no file or environment
    /// lookups and no validation.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let mut builder = Self::sources().set_override("jwt.secret", "test-jwt-secret")?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        builder.build()?.try_deserialize()
    }

    fn sources() -> ConfigBuilder<DefaultState> {
        config::Config::builder().add_source(File::from_str(EMBEDDED_DEFAULTS, FileFormat::Toml))
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.database.url.is_empty() {
            return Err(ConfigLoadError::Missing(
                "database.url (set EVENTLY__DATABASE__URL)",
            ));
        }

        if self.jwt.secret.is_empty() && self.jwt.public_key.is_empty() {
            return Err(ConfigLoadError::Missing("jwt.secret or jwt.public_key"));
        }

        if self.server.port == 0 {
            return Err(ConfigLoadError::Invalid("server.port must not be 0".into()));
        }

        if let Err(e) = self.socket_addr() {
            return Err(ConfigLoadError::Invalid(format!(
                "server address {}:{}: {}",
                self.server.host, self.server.port, e
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigLoadError::Invalid(format!(
                "database.min_connections ({}) exceeds database.max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }

        if self.storage.public_dir.is_empty() {
            return Err(ConfigLoadError::Missing("storage.public_dir"));
        }

        if !self.storage.public_url_prefix.starts_with('/') {
            return Err(ConfigLoadError::Invalid(
                "storage.public_url_prefix must start with '/'".into(),
            ));
        }

        if self.registration.lock_timeout_ms == 0 {
            return Err(ConfigLoadError::Invalid(
                "registration.lock_timeout_ms must be positive".into(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
