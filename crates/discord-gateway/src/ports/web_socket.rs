//! Stream port
//!
//! An opened bidirectional message stream, from the client's perspective.

/// Callback invoked when the stream closes
pub type CloseCallback = Box<dyn Fn() + Send + Sync>;

/// Callback invoked for each inbound text message
pub type TextCallback = Box<dyn Fn(String) + Send + Sync>;

/// Callback invoked for each inbound binary message
pub type BinaryCallback = Box<dyn Fn(Vec<u8>) + Send + Sync>;

/// A WebSocket connection between the client and the gateway
///
/// Callbacks are invoked from transport-owned threads; registrants must
/// tolerate arbitrary concurrency and re-entrance. Implementations must
/// propagate the close code to the peer.
pub trait WebSocket: Send + Sync {
    /// Send a text message
    fn text(&self, message: String);

    /// Send a binary message
    fn binary(&self, message: Vec<u8>);

    /// Close the stream with the given code
    fn close(&self, code: u16);

    /// Register the inbound text handler
    fn register_text_callback(&self, on_text: TextCallback);

    /// Register the inbound binary handler
    fn register_binary_callback(&self, on_binary: BinaryCallback);

    /// Register the close handler
    fn register_close_callback(&self, on_close: CloseCallback);
}
