//! Keep-alive engine
//!
//! Drives the heartbeat cadence and polices acknowledgements: each
//! heartbeat must be acked before the next tick, or the stream is torn
//! down with a non-graceful close code.

use super::state::{Phase, SessionState};
use super::SessionInner;
use crate::error::SessionError;
use crate::ports::WebSocket;
use crate::protocol::{CloseCode, GatewayMessage};
use std::sync::Arc;

enum TickAction {
    Beat,
    Abort(Arc<dyn WebSocket>),
}

impl SessionInner {
    /// Send a heartbeat now and schedule the next one
    ///
    /// Cancels any pending tick first, so a server-requested heartbeat
    /// resets the cadence. No-op without an open stream.
    pub(crate) fn send_heartbeat(self: &Arc<Self>) {
        let outgoing = {
            let mut state = self.lock_state();
            if let Some(token) = state.heartbeat_token.take() {
                if let Some(scheduler) = &state.scheduler {
                    scheduler.cancel(token);
                }
            }
            if state.phase == Phase::Closed {
                return;
            }
            let Some(web_socket) = state.web_socket.clone() else {
                return;
            };

            state.heartbeat_ack_pending = true;
            let message = GatewayMessage::heartbeat(state.last_sequence);

            if state.heartbeat_interval > 0.0 {
                if let Some(scheduler) = state.scheduler.clone() {
                    let now = scheduler.now();
                    state.next_heartbeat_at += state.heartbeat_interval;
                    if state.next_heartbeat_at <= now {
                        // The clock skipped past the slot; restart from now.
                        state.next_heartbeat_at = now + state.heartbeat_interval;
                    }
                    self.schedule_tick(&mut state);
                }
            }
            (web_socket, message)
        };

        let (web_socket, message) = outgoing;
        if let Ok(json) = message.to_json() {
            tracing::trace!(frame = %json, "sending heartbeat");
            web_socket.text(json);
        }
    }

    /// Schedule the next heartbeat tick at `state.next_heartbeat_at`
    ///
    /// The scheduled callback holds a non-owning reference to the session
    /// and checks for liveness when it fires.
    pub(crate) fn schedule_tick(self: &Arc<Self>, state: &mut SessionState) {
        let Some(scheduler) = state.scheduler.clone() else {
            return;
        };
        let weak = Arc::downgrade(self);
        let token = scheduler.schedule(
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.on_heartbeat_due();
                }
            }),
            state.next_heartbeat_at,
        );
        state.heartbeat_token = Some(token);
    }

    /// A scheduled heartbeat came due
    ///
    /// If the previous heartbeat was acked, beat again; otherwise the peer
    /// is unresponsive and the stream is closed through the normal funnel.
    pub(crate) fn on_heartbeat_due(self: &Arc<Self>) {
        let action = {
            let mut state = self.lock_state();
            state.heartbeat_token = None;
            if !matches!(state.phase, Phase::AwaitingHello | Phase::Live) {
                return;
            }
            let Some(web_socket) = state.web_socket.clone() else {
                return;
            };
            if state.heartbeat_ack_pending {
                TickAction::Abort(web_socket)
            } else {
                TickAction::Beat
            }
        };

        match action {
            TickAction::Beat => self.send_heartbeat(),
            TickAction::Abort(web_socket) => {
                let error = SessionError::HeartbeatAckTimeout;
                self.diagnostics().emit(error.diagnostic_level(), error.to_string());
                web_socket.close(CloseCode::UnknownError.as_u16());
                self.on_stream_closed();
            }
        }
    }
}
