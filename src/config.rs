//! Configuration management for AlertRelay
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer defaults, an optional `alertrelay.toml` file, environment
//! variables and command-line flags.

use crate::cli::Cli;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "alertrelay.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Configuration for the inbound HTTP server.
    pub server: ServerConfig,
    /// Configuration for the push provider.
    pub provider: ProviderConfig,
    /// Configuration for notification text.
    pub formatting: FormattingConfig,
    /// Configuration for the Prometheus metrics endpoint.
    pub metrics: MetricsConfig,
}

/// Configuration for the inbound HTTP server.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// The address the HTTP server listens on.
    pub listen_address: SocketAddr,
}

/// Credentials and request settings for the push provider.
///
/// Loaded once at startup and never mutated.
#[derive(Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// The provider-side application identifier.
    pub app_id: String,
    /// The REST API key sent in the `Authorization` header.
    pub api_key: String,
    /// The notification-creation endpoint.
    pub api_url: String,
    /// The scheme placed before the key in the `Authorization` header.
    pub auth_scheme: String,
    /// Delivery priority sent with every notification.
    pub priority: u8,
    /// Sound selector sent with every notification.
    pub sound: String,
    /// Request timeout in milliseconds. Unset means the HTTP client default.
    pub timeout_ms: Option<u64>,
    /// Log notifications instead of delivering them.
    pub dry_run: bool,
}

// Keep the API key out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("app_id", &self.app_id)
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("auth_scheme", &self.auth_scheme)
            .field("priority", &self.priority)
            .field("sound", &self.sound)
            .field("timeout_ms", &self.timeout_ms)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Configuration for notification text.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FormattingConfig {
    /// Prefix titles with an emoji per alert kind.
    pub emoji_titles: bool,
}

/// Configuration for the Prometheus metrics endpoint.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve `/metrics` on the main router.
    pub enabled: bool,
}

impl Config {
    /// Loads the application configuration.
    ///
    /// Sources, lowest precedence first: built-in defaults, the TOML file
    /// (`--config` or `alertrelay.toml` if present), `ALERTRELAY_` environment
    /// variables (`__` separates nested keys), then command-line flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        match &cli.config {
            Some(path) => {
                if !path.exists() {
                    bail!("configuration file not found: {}", path.display());
                }
                figment = figment.merge(Toml::file(path));
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
            }
            None => {}
        }

        let config: Config = figment
            // e.g., ALERTRELAY_PROVIDER__API_KEY=...
            .merge(Env::prefixed("ALERTRELAY_").split("__"))
            .merge(cli)
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.provider.dry_run {
            if self.provider.app_id.trim().is_empty() {
                bail!("provider.app_id is required unless provider.dry_run is set");
            }
            if self.provider.api_key.trim().is_empty() {
                bail!("provider.api_key is required unless provider.dry_run is set");
            }
        }
        if self.provider.api_url.trim().is_empty() {
            bail!("provider.api_url must not be empty");
        }
        Ok(())
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            formatting: FormattingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            api_key: String::new(),
            api_url: "https://onesignal.com/api/v1/notifications".to_string(),
            auth_scheme: "Basic".to_string(),
            priority: 10,
            sound: "emergency_alert.wav".to_string(),
            timeout_ms: None,
            dry_run: false,
        }
    }
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self { emoji_titles: true }
    }
}
