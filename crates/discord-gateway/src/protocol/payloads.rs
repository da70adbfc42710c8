//! Payload definitions
//!
//! Defines the payload structures carried in the `d` field of gateway messages.

use discord_common::Configuration;
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    /// Heartbeat interval in seconds
    #[must_use]
    pub fn interval_seconds(&self) -> f64 {
        self.heartbeat_interval as f64 / 1000.0
    }
}

/// Payload for op 2 (Identify)
///
/// Sent by the client to authenticate the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Authentication token
    pub token: String,

    /// Client properties
    pub properties: IdentifyProperties,
}

/// Client connection properties
///
/// Serialized with the `$`-prefixed keys the gateway expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyProperties {
    /// Operating system
    #[serde(rename = "$os")]
    pub os: String,

    /// Client name
    #[serde(rename = "$browser")]
    pub browser: String,

    /// Device type
    #[serde(rename = "$device")]
    pub device: String,
}

impl From<&Configuration> for IdentifyPayload {
    fn from(config: &Configuration) -> Self {
        Self {
            token: config.token.clone(),
            properties: IdentifyProperties {
                os: config.os.clone(),
                browser: config.browser.clone(),
                device: config.device.clone(),
            },
        }
    }
}
