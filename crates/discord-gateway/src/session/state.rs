//! Session state
//!
//! The single authoritative record of one controller's lifecycle, guarded
//! by the session mutex in [`super::Gateway`].

use crate::ports::{CancelFn, Scheduler, WebSocket};
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Lifecycle phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// No session yet
    Idle,
    /// A connect worker is discovering the endpoint or opening the stream
    Connecting,
    /// Stream open, waiting for the server's hello
    AwaitingHello,
    /// Identified and heartbeating
    Live,
    /// Graceful close in progress
    Closing,
    /// Session over; a new connect may start
    Closed,
}

/// Last-known stream endpoint
///
/// Single slot, no TTL. Populated with the base URL (no query suffix) and
/// cleared when that URL fails to open a stream.
#[derive(Debug, Default)]
pub(crate) struct EndpointCache {
    url: Option<String>,
}

impl EndpointCache {
    pub(crate) fn get(&self) -> Option<String> {
        self.url.clone()
    }

    pub(crate) fn store(&mut self, url: String) {
        self.url = Some(url);
    }

    pub(crate) fn invalidate(&mut self) {
        self.url = None;
    }
}

/// Caller-supplied close sink
pub(crate) type CloseNotifyCallback = Arc<dyn Fn() + Send + Sync>;

/// Mutable session state
pub(crate) struct SessionState {
    pub phase: Phase,
    pub endpoint_cache: EndpointCache,
    pub web_socket: Option<Arc<dyn WebSocket>>,
    pub scheduler: Option<Arc<dyn Scheduler>>,

    /// Heartbeat cadence in seconds; 0 until the hello arrives
    pub heartbeat_interval: f64,
    /// Absolute time of the next scheduled heartbeat
    pub next_heartbeat_at: f64,
    /// Token of the pending heartbeat tick, if any
    pub heartbeat_token: Option<u64>,
    /// A heartbeat was sent and its ack has not arrived yet
    pub heartbeat_ack_pending: bool,
    /// Most recent `s` field observed on any inbound frame
    pub last_sequence: Option<u64>,

    /// Latched by disconnect, cleared by the next connect
    pub disconnect_requested: bool,
    /// The first hello is still outstanding; later hellos are dropped
    pub awaiting_hello: bool,
    /// Cancels the transport operation currently being awaited
    pub cancel_inflight: Option<CancelFn>,

    /// Unblocks the connect worker on hello, close, or disconnect
    pub hello_signal: Option<oneshot::Sender<()>>,
    /// Confirms the remote close during a graceful disconnect
    pub close_signal: Option<oneshot::Sender<()>>,
    /// Gate future consumed at the start of the next connect
    pub proceed_with_connect: Option<BoxFuture<'static, ()>>,

    pub on_close: Option<CloseNotifyCallback>,
    /// A close happened with no sink installed; the next registration
    /// consumes this and is notified immediately
    pub close_notification_pending: bool,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Idle,
            endpoint_cache: EndpointCache::default(),
            web_socket: None,
            scheduler: None,
            heartbeat_interval: 0.0,
            next_heartbeat_at: 0.0,
            heartbeat_token: None,
            heartbeat_ack_pending: false,
            last_sequence: None,
            disconnect_requested: false,
            awaiting_hello: false,
            cancel_inflight: None,
            hello_signal: None,
            close_signal: None,
            proceed_with_connect: None,
            on_close: None,
            close_notification_pending: false,
        }
    }
}
