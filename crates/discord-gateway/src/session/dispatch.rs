//! Inbound dispatcher
//!
//! Parses inbound text frames and routes them by op code. Malformed frames
//! and unhandled op codes are reported on the diagnostic channel and
//! dropped; nothing inbound can fail the session.

use super::SessionInner;
use crate::diagnostics::level;
use crate::protocol::{GatewayMessage, HelloPayload, OpCode};
use serde_json::Value;
use std::sync::Arc;

impl SessionInner {
    /// Handle one inbound text frame
    pub(crate) fn on_text_message(self: &Arc<Self>, message: String) {
        let Ok(value) = serde_json::from_str::<Value>(&message) else {
            self.diagnostics()
                .emit(level::ERROR, format!("undecodable gateway frame: {message}"));
            return;
        };
        let Some(object) = value.as_object() else {
            self.diagnostics()
                .emit(level::ERROR, format!("gateway frame is not an object: {message}"));
            return;
        };

        self.diagnostics().emit(level::TRACE, message.clone());

        // The sequence cursor advances on any frame that carries one, even
        // frames this layer does not handle.
        if let Some(sequence) = object.get("s").and_then(Value::as_u64) {
            self.lock_state().last_sequence = Some(sequence);
        }

        let opcode = object
            .get("op")
            .and_then(Value::as_u64)
            .and_then(|op| u8::try_from(op).ok())
            .and_then(OpCode::from_u8);
        let Some(opcode) = opcode else {
            self.diagnostics()
                .emit(level::WARN, format!("unhandled gateway frame: {message}"));
            return;
        };

        match opcode {
            OpCode::Heartbeat => self.on_heartbeat_request(),
            OpCode::Hello => {
                let Ok(frame) = GatewayMessage::from_json(&message) else {
                    return;
                };
                if let Some(payload) = frame.as_hello() {
                    self.on_hello(payload);
                }
            }
            OpCode::HeartbeatAck => self.on_heartbeat_ack(),
            OpCode::Dispatch | OpCode::Identify => {
                self.diagnostics()
                    .emit(level::WARN, format!("unhandled gateway op code: {opcode}"));
            }
        }
    }

    /// Handle one inbound binary frame
    ///
    /// The control plane is text-only; binary frames are noted and dropped.
    pub(crate) fn on_binary_message(self: &Arc<Self>, message: Vec<u8>) {
        self.diagnostics().emit(
            level::TRACE,
            format!("ignoring {} byte binary gateway frame", message.len()),
        );
    }

    /// First hello only: adopt the heartbeat cadence and wake the connect
    /// worker. Later hellos are dropped.
    fn on_hello(self: &Arc<Self>, payload: HelloPayload) {
        let hello_signal = {
            let mut state = self.lock_state();
            if !state.awaiting_hello {
                return;
            }
            state.awaiting_hello = false;
            state.heartbeat_interval = payload.interval_seconds();
            if let Some(scheduler) = &state.scheduler {
                state.next_heartbeat_at = scheduler.now();
            }
            state.hello_signal.take()
        };

        self.diagnostics().emit(
            level::INFO,
            format!(
                "hello received, heartbeat interval {}ms",
                payload.heartbeat_interval
            ),
        );
        self.send_heartbeat();
        if let Some(hello_signal) = hello_signal {
            let _ = hello_signal.send(());
        }
    }

    /// The server asked for an immediate heartbeat (op 1)
    fn on_heartbeat_request(self: &Arc<Self>) {
        self.diagnostics()
            .emit(level::TRACE, "heartbeat requested by gateway");
        self.send_heartbeat();
    }

    /// The server acknowledged our last heartbeat (op 11)
    fn on_heartbeat_ack(self: &Arc<Self>) {
        self.diagnostics().emit(level::TRACE, "heartbeat acknowledged");
        self.lock_state().heartbeat_ack_pending = false;
    }
}
