//! Dependency ports
//!
//! Abstract interfaces the caller implements to supply networking and
//! timing capabilities. The controller owns no sockets and reads no clocks.

mod connections;
mod scheduler;
mod web_socket;

pub use connections::{
    CancelFn, Connections, Header, ResourceRequest, ResourceRequestTransaction, Response,
    WebSocketRequest, WebSocketRequestTransaction, STATUS_CANCELLED,
};
pub use scheduler::{Clock, ScheduledCallback, Scheduler};
pub use web_socket::{BinaryCallback, CloseCallback, TextCallback, WebSocket};
