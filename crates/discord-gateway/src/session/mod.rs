//! Gateway session controller
//!
//! Owns the session state machine, guards concurrency around a single
//! session mutex, fans out close notifications, and exposes the public
//! surface: connect, disconnect, and callback registration.
//!
//! User-supplied callbacks are always invoked without the session lock
//! held, so they may call back into the controller.

mod connect;
mod dispatch;
mod heartbeat;
mod state;

use crate::diagnostics::DiagnosticRelay;
use crate::error::SessionError;
use crate::ports::{Connections, Scheduler};
use crate::protocol::CloseCode;
use discord_common::Configuration;
use state::{Phase, SessionState};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;

/// How long a disconnect waits for the peer to confirm the close
const CLOSE_WAIT: Duration = Duration::from_millis(1000);

/// Client-side gateway session controller
///
/// Cheap to clone; all clones drive the same session. A controller runs at
/// most one session at a time but survives any number of
/// connect/disconnect cycles.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    state: Mutex<SessionState>,
    diagnostics: DiagnosticRelay,
}

impl Gateway {
    /// Create a controller with no session
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState::new()),
                diagnostics: DiagnosticRelay::new(),
            }),
        }
    }

    /// Replace the scheduler
    ///
    /// Cancels any outstanding heartbeat schedule; if the session is live,
    /// the heartbeat is rescheduled on the new scheduler.
    pub fn set_scheduler(&self, scheduler: Arc<dyn Scheduler>) {
        let mut state = self.inner.lock_state();
        if let Some(token) = state.heartbeat_token.take() {
            if let Some(old) = &state.scheduler {
                old.cancel(token);
            }
        }
        state.scheduler = Some(scheduler);
        if state.phase == Phase::Live && state.heartbeat_interval > 0.0 {
            self.inner.schedule_tick(&mut state);
        }
    }

    /// Park the next connect until `proceed` completes
    ///
    /// Consumed by the next connect only; used by tests to force race
    /// orderings around the connect gate.
    pub fn wait_before_connect(&self, proceed: impl Future<Output = ()> + Send + 'static) {
        self.inner.lock_state().proceed_with_connect = Some(Box::pin(proceed));
    }

    /// Establish a session
    ///
    /// Resolves `true` once the hello has been received and the identify
    /// sent; `false` on any failure or on a disconnect racing the connect.
    /// A connect issued while another session is in flight resolves `false`
    /// immediately. Must be called from within a Tokio runtime.
    pub fn connect(
        &self,
        connections: Arc<dyn Connections>,
        configuration: Configuration,
    ) -> impl Future<Output = bool> + Send + 'static {
        use futures_util::future::Either;

        let gate = {
            let mut state = self.inner.lock_state();
            match state.phase {
                Phase::Idle | Phase::Closed => {
                    state.phase = Phase::Connecting;
                    state.disconnect_requested = false;
                    state.close_notification_pending = false;
                    state.heartbeat_interval = 0.0;
                    state.heartbeat_ack_pending = false;
                    state.last_sequence = None;
                    Ok(state.proceed_with_connect.take())
                }
                Phase::Connecting | Phase::AwaitingHello => Err(SessionError::AlreadyConnecting),
                Phase::Live | Phase::Closing => Err(SessionError::AlreadyConnected),
            }
        };

        match gate {
            Err(error) => {
                self.inner
                    .diagnostics
                    .emit(error.diagnostic_level(), error.to_string());
                Either::Left(std::future::ready(false))
            }
            Ok(proceed) => {
                let inner = Arc::clone(&self.inner);
                let worker = tokio::spawn(async move {
                    inner.run_connect(connections, configuration, proceed).await
                });
                Either::Right(async move { worker.await.unwrap_or(false) })
            }
        }
    }

    /// Tear the session down
    ///
    /// Latches the disconnect flag, cancels any in-flight transport
    /// operation, closes the stream gracefully, and waits up to one second
    /// for the peer to confirm before finishing the teardown locally.
    /// An in-flight connect observes the flag and resolves `false`.
    pub async fn disconnect(&self) {
        let (cancel, web_socket, close_wait) = {
            let mut state = self.inner.lock_state();
            state.disconnect_requested = true;
            let cancel = state.cancel_inflight.take();
            if let Some(hello) = state.hello_signal.take() {
                let _ = hello.send(());
            }
            let web_socket = state.web_socket.clone();
            let close_wait = web_socket.as_ref().map(|_| {
                state.phase = Phase::Closing;
                let (tx, rx) = oneshot::channel();
                state.close_signal = Some(tx);
                rx
            });
            (cancel, web_socket, close_wait)
        };

        if let Some(cancel) = cancel {
            cancel();
        }
        if let Some(web_socket) = web_socket {
            tracing::debug!("closing gateway stream");
            web_socket.close(CloseCode::Normal.as_u16());
            if let Some(close_wait) = close_wait {
                if tokio::time::timeout(CLOSE_WAIT, close_wait).await.is_err() {
                    let error = SessionError::CloseTimeout;
                    self.inner
                        .diagnostics
                        .emit(error.diagnostic_level(), error.to_string());
                }
            }
            self.inner.on_stream_closed();
        }
    }

    /// Install the close sink
    ///
    /// If the session already closed without a sink installed, the callback
    /// is invoked synchronously before this returns.
    pub fn register_close_callback(&self, on_close: impl Fn() + Send + Sync + 'static) {
        let callback: state::CloseNotifyCallback = Arc::new(on_close);
        let deliver = {
            let mut state = self.inner.lock_state();
            state.on_close = Some(Arc::clone(&callback));
            if state.phase == Phase::Closed && state.close_notification_pending {
                state.close_notification_pending = false;
                true
            } else {
                false
            }
        };
        if deliver {
            callback();
        }
    }

    /// Install the diagnostic sink
    ///
    /// Diagnostics produced before registration are delivered first, in the
    /// order they were produced.
    pub fn register_diagnostic_message_callback(
        &self,
        on_diagnostic_message: impl Fn(usize, String) + Send + Sync + 'static,
    ) {
        self.inner.diagnostics.register(Arc::new(on_diagnostic_message));
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("Gateway")
            .field("phase", &state.phase)
            .field("heartbeat_interval", &state.heartbeat_interval)
            .finish()
    }
}

impl SessionInner {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().expect("session state poisoned")
    }

    pub(crate) fn diagnostics(&self) -> &DiagnosticRelay {
        &self.diagnostics
    }

    /// Single entry point into the Closed phase
    ///
    /// Idempotent. Cancels scheduled work, clears the stream, confirms any
    /// pending graceful close, unblocks a connect still waiting on hello,
    /// and delivers the close notification exactly once per transition.
    pub(crate) fn on_stream_closed(&self) {
        let (callback, hello_signal, close_signal) = {
            let mut state = self.lock_state();
            if state.phase == Phase::Closed {
                return;
            }
            state.phase = Phase::Closed;
            state.web_socket = None;
            state.awaiting_hello = false;
            state.heartbeat_ack_pending = false;
            if let Some(token) = state.heartbeat_token.take() {
                if let Some(scheduler) = &state.scheduler {
                    scheduler.cancel(token);
                }
            }
            let hello_signal = state.hello_signal.take();
            let close_signal = state.close_signal.take();
            let callback = match &state.on_close {
                Some(callback) => Some(Arc::clone(callback)),
                None => {
                    state.close_notification_pending = true;
                    None
                }
            };
            (callback, hello_signal, close_signal)
        };

        let error = SessionError::RemoteClose;
        self.diagnostics.emit(error.diagnostic_level(), error.to_string());

        if let Some(hello_signal) = hello_signal {
            let _ = hello_signal.send(());
        }
        if let Some(close_signal) = close_signal {
            let _ = close_signal.send(());
        }
        if let Some(callback) = callback {
            callback();
        }
    }
}
