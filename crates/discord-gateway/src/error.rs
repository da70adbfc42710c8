//! Session error taxonomy
//!
//! None of these escape the public surface: every failure collapses to a
//! `false` connect result or a close notification. The variants exist to
//! give diagnostics and logs one consistent wording per failure kind.

use crate::diagnostics::level;

/// Internal failure kinds of the session controller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A connect was issued while another connect is in flight
    #[error("connect already in progress")]
    AlreadyConnecting,

    /// A connect was issued while a session is established
    #[error("already connected")]
    AlreadyConnected,

    /// Endpoint discovery returned a non-OK status or an unusable body
    #[error("endpoint discovery failed: {0}")]
    DiscoveryFailed(String),

    /// The transport could not open the gateway stream
    #[error("unable to open gateway stream")]
    StreamOpenFailed,

    /// A heartbeat went unacknowledged for a full interval
    #[error("heartbeat not acknowledged in time")]
    HeartbeatAckTimeout,

    /// The peer closed the stream
    #[error("gateway stream closed")]
    RemoteClose,

    /// A disconnect cancelled the connect in flight
    #[error("connect cancelled")]
    LocalCancelled,

    /// The peer did not confirm a graceful close in time
    #[error("timeout waiting for stream close confirmation")]
    CloseTimeout,
}

impl SessionError {
    /// Diagnostic level this failure is reported at
    #[must_use]
    pub fn diagnostic_level(&self) -> usize {
        match self {
            Self::RemoteClose | Self::LocalCancelled => level::INFO,
            Self::AlreadyConnecting
            | Self::AlreadyConnected
            | Self::DiscoveryFailed(_)
            | Self::StreamOpenFailed
            | Self::HeartbeatAckTimeout
            | Self::CloseTimeout => level::WARN,
        }
    }
}
