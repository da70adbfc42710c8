//! Transport port
//!
//! Request/response and WebSocket-open operations, each returning a result
//! future paired with a cancel callable.

use super::WebSocket;
use futures_util::future::BoxFuture;
use std::sync::Arc;

/// Status code a transport reports for a locally cancelled request
pub const STATUS_CANCELLED: u16 = 499;

/// A single request or response header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub key: String,
    pub value: String,
}

impl Header {
    /// Create a header
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A request-response exchange to queue on the transport
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub method: String,
    pub uri: String,
    pub headers: Vec<Header>,
    pub body: String,
}

/// The transport's answer to a [`ResourceRequest`]
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<Header>,
    pub body: String,
}

/// A request to open a WebSocket stream
#[derive(Debug, Clone)]
pub struct WebSocketRequest {
    pub uri: String,
}

/// Cancels an in-flight transport operation
///
/// Invoking it must cause the paired future to complete within bounded
/// time: a cancelled resource request resolves with status
/// [`STATUS_CANCELLED`], a cancelled WebSocket open resolves with `None`.
pub type CancelFn = Box<dyn FnOnce() + Send>;

/// An in-flight request-response exchange
pub struct ResourceRequestTransaction {
    /// Resolves with the transport's response
    pub response: BoxFuture<'static, Response>,
    /// Aborts the exchange
    pub cancel: CancelFn,
}

/// An in-flight WebSocket open
pub struct WebSocketRequestTransaction {
    /// Resolves with the opened stream, or `None` if the open failed
    pub web_socket: BoxFuture<'static, Option<Arc<dyn WebSocket>>>,
    /// Aborts the open
    pub cancel: CancelFn,
}

/// Networking dependencies of the gateway client
///
/// Implementations queue work immediately; the returned transaction carries
/// the eventual outcome. Futures and cancel callables may outlive the
/// controller call that created them.
pub trait Connections: Send + Sync {
    /// Queue a request-response exchange
    fn queue_resource_request(&self, request: ResourceRequest) -> ResourceRequestTransaction;

    /// Queue a WebSocket open
    fn queue_web_socket_request(&self, request: WebSocketRequest) -> WebSocketRequestTransaction;
}
