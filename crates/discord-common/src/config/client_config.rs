//! Gateway client configuration
//!
//! Loads configuration from environment variables or explicit values.

use serde::Deserialize;
use std::env;

/// Configuration for a gateway session
///
/// Everything the client sends when identifying itself, plus the
/// `User-Agent` used for endpoint discovery.
#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    /// Authentication token
    pub token: String,

    /// Operating system reported in the identify payload
    #[serde(default = "default_os")]
    pub os: String,

    /// Client name reported in the identify payload
    #[serde(default = "default_client_name")]
    pub browser: String,

    /// Device type reported in the identify payload
    #[serde(default = "default_client_name")]
    pub device: String,

    /// `User-Agent` header sent on endpoint discovery requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Configuration {
    /// Create a configuration with the given token and default client metadata
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            os: default_os(),
            browser: default_client_name(),
            device: default_client_name(),
            user_agent: default_user_agent(),
        }
    }

    /// Set the reported operating system
    #[must_use]
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    /// Set the reported client name
    #[must_use]
    pub fn with_browser(mut self, browser: impl Into<String>) -> Self {
        self.browser = browser.into();
        self
    }

    /// Set the reported device type
    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Set the discovery `User-Agent`
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Load configuration from environment variables
    ///
    /// `DISCORD_TOKEN` is required; `DISCORD_OS`, `DISCORD_BROWSER`,
    /// `DISCORD_DEVICE`, and `DISCORD_USER_AGENT` fall back to defaults.
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            token: env::var("DISCORD_TOKEN").map_err(|_| ConfigError::MissingVar("DISCORD_TOKEN"))?,
            os: env::var("DISCORD_OS").unwrap_or_else(|_| default_os()),
            browser: env::var("DISCORD_BROWSER").unwrap_or_else(|_| default_client_name()),
            device: env::var("DISCORD_DEVICE").unwrap_or_else(|_| default_client_name()),
            user_agent: env::var("DISCORD_USER_AGENT").unwrap_or_else(|_| default_user_agent()),
        })
    }
}

// Default value functions
fn default_os() -> String {
    env::consts::OS.to_string()
}

fn default_client_name() -> String {
    "discord-gateway".to_string()
}

fn default_user_agent() -> String {
    format!("DiscordBot (discord-gateway, {})", env!("CARGO_PKG_VERSION"))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
}
