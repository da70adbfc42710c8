//! Diagnostics relay
//!
//! Caller-facing diagnostic channel: `(level, message)` events buffered
//! until a sink is registered, then forwarded directly. Every event is also
//! mirrored to `tracing` at a mapped level.

use std::sync::{Arc, Mutex};

/// Diagnostic levels used by the session controller
pub mod level {
    /// Per-message traffic (raw inbound frames, heartbeat chatter)
    pub const TRACE: usize = 0;
    /// Lifecycle milestones (hello received, stream closed)
    pub const INFO: usize = 1;
    /// Recoverable protocol trouble (unknown opcode, close-wait timeout)
    pub const WARN: usize = 5;
    /// Malformed input (undecodable frames)
    pub const ERROR: usize = 10;
}

/// Caller-supplied diagnostic sink
pub type DiagnosticCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Buffers diagnostics until a sink is registered, then forwards
pub(crate) struct DiagnosticRelay {
    inner: Mutex<RelayState>,
}

struct RelayState {
    sink: Option<DiagnosticCallback>,
    backlog: Vec<(usize, String)>,
}

impl DiagnosticRelay {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(RelayState {
                sink: None,
                backlog: Vec::new(),
            }),
        }
    }

    /// Emit a diagnostic event
    ///
    /// Delivered to the sink if one is installed, otherwise buffered. The
    /// sink runs without the relay lock held.
    pub(crate) fn emit(&self, level: usize, message: impl Into<String>) {
        let message = message.into();
        match level {
            level::TRACE => tracing::trace!("{message}"),
            l if l < level::WARN => tracing::info!("{message}"),
            l if l < level::ERROR => tracing::warn!("{message}"),
            _ => tracing::error!("{message}"),
        }

        let sink = {
            let mut state = self.inner.lock().expect("diagnostic relay poisoned");
            match &state.sink {
                Some(sink) => Some(Arc::clone(sink)),
                None => {
                    state.backlog.push((level, message.clone()));
                    None
                }
            }
        };
        if let Some(sink) = sink {
            sink(level, message);
        }
    }

    /// Install the sink and drain any backlog into it in FIFO order
    ///
    /// The sink is installed before the drain, so events emitted while the
    /// drain is in progress are delivered directly rather than re-buffered.
    pub(crate) fn register(&self, sink: DiagnosticCallback) {
        let backlog = {
            let mut state = self.inner.lock().expect("diagnostic relay poisoned");
            state.sink = Some(Arc::clone(&sink));
            std::mem::take(&mut state.backlog)
        };
        for (level, message) in backlog {
            sink(level, message);
        }
    }
}
