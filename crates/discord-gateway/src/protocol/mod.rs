//! Gateway wire protocol
//!
//! Message framing, operation codes, payloads, and close codes for the
//! JSON text protocol spoken over the gateway WebSocket.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{HelloPayload, IdentifyPayload, IdentifyProperties};
