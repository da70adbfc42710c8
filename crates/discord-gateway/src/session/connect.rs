//! Connection procedure
//!
//! One worker per connect: discover the endpoint (unless cached), open the
//! stream, wait for hello, identify, go live. A disconnect can interrupt
//! the worker at any await point; the published cancel callable and the
//! re-checked disconnect flag bound how long that takes.

use super::state::Phase;
use super::SessionInner;
use crate::diagnostics::level;
use crate::error::SessionError;
use crate::ports::{
    CancelFn, Connections, Header, ResourceRequest, WebSocket, WebSocketRequest,
};
use crate::protocol::{CloseCode, GatewayMessage, IdentifyPayload};
use discord_common::Configuration;
use futures_util::future::BoxFuture;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Discovery endpoint for the stream URL
pub(crate) const GATEWAY_DISCOVERY_URI: &str = "https://discordapp.com/api/v6/gateway";

/// Query suffix appended to the base URL when opening the stream
pub(crate) const STREAM_QUERY_SUFFIX: &str = "/?v=6&encoding=json";

/// Shape of a usable discovery response body
#[derive(Debug, Deserialize)]
struct GatewayEndpoint {
    url: String,
}

impl SessionInner {
    /// Drive one connect attempt to live or to failure
    pub(crate) async fn run_connect(
        self: Arc<Self>,
        connections: Arc<dyn Connections>,
        configuration: Configuration,
        proceed: Option<BoxFuture<'static, ()>>,
    ) -> bool {
        // Gate wait
        if let Some(proceed) = proceed {
            proceed.await;
        }
        if self.disconnect_requested() {
            return self.abort_connect(SessionError::LocalCancelled);
        }

        // Open attempt against the cached endpoint
        let mut web_socket = None;
        let cached_endpoint = self.lock_state().endpoint_cache.get();
        if let Some(cached) = cached_endpoint {
            web_socket = self.open_web_socket(&connections, &cached).await;
            if web_socket.is_none() {
                self.lock_state().endpoint_cache.invalidate();
            }
            if self.disconnect_requested() {
                return self.abort_connect(SessionError::LocalCancelled);
            }
        }

        // Discovery fallback
        if web_socket.is_none() {
            let url = match self.discover_endpoint(&connections, &configuration).await {
                Ok(url) => url,
                Err(error) => return self.abort_connect(error),
            };
            if self.disconnect_requested() {
                return self.abort_connect(SessionError::LocalCancelled);
            }
            self.lock_state().endpoint_cache.store(url.clone());
            web_socket = self.open_web_socket(&connections, &url).await;
            if web_socket.is_none() {
                self.lock_state().endpoint_cache.invalidate();
            }
            if self.disconnect_requested() {
                return self.abort_connect(SessionError::LocalCancelled);
            }
        }

        // Failure funnel
        let Some(web_socket) = web_socket else {
            return self.abort_connect(SessionError::StreamOpenFailed);
        };

        // Install handlers and start waiting for the hello
        let hello_wait = {
            let mut state = self.lock_state();
            if state.disconnect_requested {
                drop(state);
                web_socket.close(CloseCode::Normal.as_u16());
                return self.abort_connect(SessionError::LocalCancelled);
            }
            state.web_socket = Some(Arc::clone(&web_socket));
            state.phase = Phase::AwaitingHello;
            state.awaiting_hello = true;
            let (tx, rx) = oneshot::channel();
            state.hello_signal = Some(tx);
            rx
        };
        self.install_stream_callbacks(&web_socket);

        // Hello, a remote close, or a disconnect fires the signal
        let _ = hello_wait.await;

        // Cancellation check
        let (cancelled, disconnected) = {
            let state = self.lock_state();
            (
                state.disconnect_requested || state.phase != Phase::AwaitingHello,
                state.disconnect_requested,
            )
        };
        if cancelled {
            let web_socket = self.lock_state().web_socket.take();
            if let Some(web_socket) = web_socket {
                web_socket.close(CloseCode::Normal.as_u16());
            }
            self.on_stream_closed();
            if disconnected {
                let error = SessionError::LocalCancelled;
                self.diagnostics().emit(error.diagnostic_level(), error.to_string());
            }
            return false;
        }

        // Identify
        let identify = GatewayMessage::identify(IdentifyPayload::from(&configuration));
        if let Ok(json) = identify.to_json() {
            web_socket.text(json);
        }

        // Go live
        let mut state = self.lock_state();
        if state.phase == Phase::AwaitingHello {
            state.phase = Phase::Live;
            drop(state);
            self.diagnostics().emit(level::INFO, "gateway session established");
            true
        } else {
            false
        }
    }

    /// Ask the request/response API where the stream lives
    async fn discover_endpoint(
        &self,
        connections: &Arc<dyn Connections>,
        configuration: &Configuration,
    ) -> Result<String, SessionError> {
        let transaction = connections.queue_resource_request(ResourceRequest {
            method: "GET".to_string(),
            uri: GATEWAY_DISCOVERY_URI.to_string(),
            headers: vec![Header::new("User-Agent", configuration.user_agent.clone())],
            body: String::new(),
        });
        self.publish_cancel(transaction.cancel);
        let response = transaction.response.await;
        self.clear_cancel();

        if response.status != 200 {
            return Err(SessionError::DiscoveryFailed(format!(
                "status {}",
                response.status
            )));
        }
        let endpoint: GatewayEndpoint = serde_json::from_str(&response.body)
            .map_err(|_| SessionError::DiscoveryFailed("unusable response body".to_string()))?;
        Ok(endpoint.url)
    }

    /// Try to open the stream at `endpoint`
    ///
    /// Returns `None` on open failure or when a disconnect raced the open;
    /// a stream that arrives after the race is closed before returning.
    async fn open_web_socket(
        &self,
        connections: &Arc<dyn Connections>,
        endpoint: &str,
    ) -> Option<Arc<dyn WebSocket>> {
        let transaction = connections.queue_web_socket_request(WebSocketRequest {
            uri: format!("{endpoint}{STREAM_QUERY_SUFFIX}"),
        });
        self.publish_cancel(transaction.cancel);
        let web_socket = transaction.web_socket.await;
        self.clear_cancel();

        if self.disconnect_requested() {
            if let Some(web_socket) = web_socket {
                web_socket.close(CloseCode::Normal.as_u16());
            }
            return None;
        }
        web_socket
    }

    /// Wire the stream's callbacks into the dispatcher and close funnel
    ///
    /// Callbacks hold a non-owning reference so a dropped controller does
    /// not linger inside the transport.
    fn install_stream_callbacks(self: &Arc<Self>, web_socket: &Arc<dyn WebSocket>) {
        let weak = Arc::downgrade(self);
        web_socket.register_close_callback(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_stream_closed();
            }
        }));

        let weak = Arc::downgrade(self);
        web_socket.register_text_callback(Box::new(move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.on_text_message(message);
            }
        }));

        let weak = Arc::downgrade(self);
        web_socket.register_binary_callback(Box::new(move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.on_binary_message(message);
            }
        }));
    }

    /// Publish a cancel callable for the operation about to be awaited
    ///
    /// If a disconnect already latched, the operation is cancelled here
    /// instead so its future resolves promptly.
    fn publish_cancel(&self, cancel: CancelFn) {
        let run_now = {
            let mut state = self.lock_state();
            if state.disconnect_requested {
                Some(cancel)
            } else {
                state.cancel_inflight = Some(cancel);
                None
            }
        };
        if let Some(cancel) = run_now {
            cancel();
        }
    }

    fn clear_cancel(&self) {
        self.lock_state().cancel_inflight = None;
    }

    fn disconnect_requested(&self) -> bool {
        self.lock_state().disconnect_requested
    }

    /// Fail a connect that never installed a stream
    fn abort_connect(&self, error: SessionError) -> bool {
        self.diagnostics().emit(error.diagnostic_level(), error.to_string());
        let mut state = self.lock_state();
        state.cancel_inflight = None;
        state.phase = Phase::Closed;
        false
    }
}
