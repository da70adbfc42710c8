//! Shared fixtures and mocks for the gateway integration tests

#![allow(dead_code)]

use discord_gateway::ports::{
    BinaryCallback, CloseCallback, ScheduledCallback, TextCallback,
};
use discord_gateway::{
    Configuration, Connections, Gateway, ResourceRequest, ResourceRequestTransaction, Response,
    Scheduler, WebSocket, WebSocketRequest, WebSocketRequestTransaction,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Heartbeat interval the mock server advertises, in milliseconds
pub const HEARTBEAT_INTERVAL_MS: u64 = 45_000;

/// Heartbeat interval in seconds, as the scheduler sees it
pub const HEARTBEAT_INTERVAL_SECS: f64 = 45.0;

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

pub fn hello_frame(interval_ms: u64) -> String {
    format!(r#"{{"op":10,"d":{{"heartbeat_interval":{interval_ms}}}}}"#)
}

pub fn heartbeat_request_frame() -> String {
    r#"{"op":1,"d":null}"#.to_string()
}

pub fn heartbeat_ack_frame() -> String {
    r#"{"op":11}"#.to_string()
}

pub const HEARTBEAT_TEXT: &str = r#"{"op":1,"d":null}"#;

// ---------------------------------------------------------------------------
// MockWebSocket
// ---------------------------------------------------------------------------

/// Fake stream recording outbound traffic and letting tests inject inbound
/// frames and closes
pub struct MockWebSocket {
    state: Mutex<WebSocketState>,
    /// When false, a local close is not echoed back through the close
    /// callback, like a peer that never confirms
    confirm_close: AtomicBool,
}

struct WebSocketState {
    closed: bool,
    close_code: Option<u16>,
    texts: Vec<String>,
    on_text: Option<Arc<dyn Fn(String) + Send + Sync>>,
    on_binary: Option<Arc<dyn Fn(Vec<u8>) + Send + Sync>>,
    on_close: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl MockWebSocket {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(WebSocketState {
                closed: false,
                close_code: None,
                texts: Vec::new(),
                on_text: None,
                on_binary: None,
                on_close: None,
            }),
            confirm_close: AtomicBool::new(true),
        })
    }

    /// Stop echoing local closes through the close callback
    pub fn set_confirm_close(&self, confirm: bool) {
        self.confirm_close.store(confirm, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn close_code(&self) -> Option<u16> {
        self.state.lock().unwrap().close_code
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.state.lock().unwrap().texts.clone()
    }

    pub fn clear_texts(&self) {
        self.state.lock().unwrap().texts.clear();
    }

    /// Deliver an inbound text frame, as the transport would
    pub fn deliver_text(&self, message: &str) {
        let on_text = self.state.lock().unwrap().on_text.clone();
        let on_text = on_text.expect("no text callback registered");
        on_text(message.to_string());
    }

    /// Deliver an inbound binary frame
    pub fn deliver_binary(&self, message: Vec<u8>) {
        let on_binary = self.state.lock().unwrap().on_binary.clone();
        let on_binary = on_binary.expect("no binary callback registered");
        on_binary(message);
    }

    /// Close initiated by the peer
    pub fn remote_close(&self) {
        let on_close = self.state.lock().unwrap().on_close.clone();
        if let Some(on_close) = on_close {
            on_close();
        }
    }

    /// Wait until the controller has registered its text callback
    pub async fn wait_for_callbacks(&self) -> bool {
        for _ in 0..200 {
            if self.state.lock().unwrap().on_text.is_some() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}

impl WebSocket for MockWebSocket {
    fn text(&self, message: String) {
        self.state.lock().unwrap().texts.push(message);
    }

    fn binary(&self, _message: Vec<u8>) {}

    fn close(&self, code: u16) {
        let on_close = {
            let mut state = self.state.lock().unwrap();
            state.closed = true;
            state.close_code = Some(code);
            state.on_close.clone()
        };
        if self.confirm_close.load(Ordering::SeqCst) {
            if let Some(on_close) = on_close {
                on_close();
            }
        }
    }

    fn register_text_callback(&self, on_text: TextCallback) {
        self.state.lock().unwrap().on_text = Some(Arc::from(on_text));
    }

    fn register_binary_callback(&self, on_binary: BinaryCallback) {
        self.state.lock().unwrap().on_binary = Some(Arc::from(on_binary));
    }

    fn register_close_callback(&self, on_close: CloseCallback) {
        self.state.lock().unwrap().on_close = Some(Arc::from(on_close));
    }
}

// ---------------------------------------------------------------------------
// MockConnections
// ---------------------------------------------------------------------------

/// One recorded request-response exchange
pub struct RecordedResourceRequest {
    pub request: ResourceRequest,
    responder: Mutex<Option<oneshot::Sender<Response>>>,
    cancelled: AtomicBool,
}

impl RecordedResourceRequest {
    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn respond(&self, response: Response) {
        if let Some(responder) = self.responder.lock().unwrap().take() {
            let _ = responder.send(response);
        }
    }
}

/// One recorded stream-open attempt
pub struct RecordedWebSocketRequest {
    pub request: WebSocketRequest,
    responder: Mutex<Option<oneshot::Sender<Option<Arc<dyn WebSocket>>>>>,
    cancelled: AtomicBool,
}

impl RecordedWebSocketRequest {
    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn respond(&self, web_socket: Option<Arc<dyn WebSocket>>) {
        if let Some(responder) = self.responder.lock().unwrap().take() {
            let _ = responder.send(web_socket);
        }
    }
}

/// Fake transport recording every queued operation for the test to answer
pub struct MockConnections {
    state: Mutex<ConnectionsState>,
}

struct ConnectionsState {
    resource_requests: Vec<Arc<RecordedResourceRequest>>,
    web_socket_requests: Vec<Arc<RecordedWebSocketRequest>>,
}

impl MockConnections {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ConnectionsState {
                resource_requests: Vec::new(),
                web_socket_requests: Vec::new(),
            }),
        })
    }

    pub fn resource_request_count(&self) -> usize {
        self.state.lock().unwrap().resource_requests.len()
    }

    pub fn web_socket_request_count(&self) -> usize {
        self.state.lock().unwrap().web_socket_requests.len()
    }

    pub fn resource_request(&self, index: usize) -> Arc<RecordedResourceRequest> {
        Arc::clone(&self.state.lock().unwrap().resource_requests[index])
    }

    pub fn web_socket_request(&self, index: usize) -> Arc<RecordedWebSocketRequest> {
        Arc::clone(&self.state.lock().unwrap().web_socket_requests[index])
    }

    pub async fn wait_for_resource_requests(&self, count: usize) -> bool {
        for _ in 0..200 {
            if self.resource_request_count() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    pub async fn wait_for_web_socket_requests(&self, count: usize) -> bool {
        for _ in 0..200 {
            if self.web_socket_request_count() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    pub fn respond_to_resource_request(&self, index: usize, status: u16, body: &str) {
        self.resource_request(index).respond(Response {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        });
    }

    pub fn respond_to_web_socket_request(
        &self,
        index: usize,
        web_socket: Option<Arc<dyn WebSocket>>,
    ) {
        self.web_socket_request(index).respond(web_socket);
    }
}

impl Connections for MockConnections {
    fn queue_resource_request(&self, request: ResourceRequest) -> ResourceRequestTransaction {
        let (tx, rx) = oneshot::channel();
        let recorded = Arc::new(RecordedResourceRequest {
            request,
            responder: Mutex::new(Some(tx)),
            cancelled: AtomicBool::new(false),
        });
        self.state
            .lock()
            .unwrap()
            .resource_requests
            .push(Arc::clone(&recorded));

        ResourceRequestTransaction {
            response: Box::pin(async move {
                rx.await.unwrap_or(Response {
                    status: 499,
                    headers: Vec::new(),
                    body: String::new(),
                })
            }),
            cancel: Box::new(move || {
                recorded.cancelled.store(true, Ordering::SeqCst);
                recorded.respond(Response {
                    status: 499,
                    headers: Vec::new(),
                    body: String::new(),
                });
            }),
        }
    }

    fn queue_web_socket_request(&self, request: WebSocketRequest) -> WebSocketRequestTransaction {
        let (tx, rx) = oneshot::channel();
        let recorded = Arc::new(RecordedWebSocketRequest {
            request,
            responder: Mutex::new(Some(tx)),
            cancelled: AtomicBool::new(false),
        });
        self.state
            .lock()
            .unwrap()
            .web_socket_requests
            .push(Arc::clone(&recorded));

        WebSocketRequestTransaction {
            web_socket: Box::pin(async move { rx.await.unwrap_or(None) }),
            cancel: Box::new(move || {
                recorded.cancelled.store(true, Ordering::SeqCst);
                recorded.respond(None);
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// ManualScheduler
// ---------------------------------------------------------------------------

/// Scheduler with hand-cranked time
///
/// `advance` moves the clock; `wake` runs every callback whose due time has
/// passed, outside the scheduler lock.
pub struct ManualScheduler {
    state: Mutex<SchedulerState>,
}

struct SchedulerState {
    now: f64,
    next_token: u64,
    pending: Vec<PendingTick>,
}

struct PendingTick {
    token: u64,
    due: f64,
    callback: ScheduledCallback,
}

impl ManualScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SchedulerState {
                now: 0.0,
                next_token: 1,
                pending: Vec::new(),
            }),
        })
    }

    pub fn advance(&self, seconds: f64) {
        self.state.lock().unwrap().now += seconds;
    }

    pub fn wake(&self) {
        loop {
            let due = {
                let mut state = self.state.lock().unwrap();
                let now = state.now;
                match state.pending.iter().position(|tick| tick.due <= now) {
                    Some(index) => state.pending.remove(index).callback,
                    None => break,
                }
            };
            due();
        }
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> f64 {
        self.state.lock().unwrap().now
    }

    fn schedule(&self, callback: ScheduledCallback, due: f64) -> u64 {
        let mut state = self.state.lock().unwrap();
        let token = state.next_token;
        state.next_token += 1;
        state.pending.push(PendingTick {
            token,
            due,
            callback,
        });
        token
    }

    fn cancel(&self, token: u64) {
        self.state
            .lock()
            .unwrap()
            .pending
            .retain(|tick| tick.token != token);
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// Common setup shared by the integration tests
pub struct Fixture {
    pub gateway: Gateway,
    pub connections: Arc<MockConnections>,
    pub scheduler: Arc<ManualScheduler>,
    pub web_socket: Arc<MockWebSocket>,
}

impl Fixture {
    pub fn new() -> Self {
        let gateway = Gateway::new();
        let scheduler = ManualScheduler::new();
        gateway.set_scheduler(scheduler.clone());
        Self {
            gateway,
            connections: MockConnections::new(),
            scheduler,
            web_socket: MockWebSocket::new(),
        }
    }

    pub fn configuration() -> Configuration {
        Configuration::new("Bot test-token")
            .with_os("linux")
            .with_browser("test-client")
            .with_device("test-device")
            .with_user_agent("DiscordBot")
    }

    /// Start a connect without driving the mocks
    pub fn connect_future(&self) -> impl Future<Output = bool> + Send + 'static {
        self.gateway
            .connect(self.connections.clone(), Self::configuration())
    }

    /// Drive a full connect: discovery, stream open, hello
    pub async fn connect(&self) -> bool {
        let connected = self.connect_future();
        let next_resource = self.connections.resource_request_count();
        assert!(
            self.connections
                .wait_for_resource_requests(next_resource + 1)
                .await,
            "no endpoint discovery request"
        );
        self.connections.respond_to_resource_request(
            next_resource,
            200,
            r#"{"url":"wss://gateway.discord.gg"}"#,
        );
        self.finish_connect(connected, &self.web_socket).await
    }

    /// Drive a connect that skips discovery (cached endpoint)
    pub async fn reconnect(&self, web_socket: &Arc<MockWebSocket>) -> bool {
        let connected = self.connect_future();
        self.finish_connect(connected, web_socket).await
    }

    /// Answer the next stream open with `web_socket` and deliver the hello
    pub async fn finish_connect(
        &self,
        connected: impl Future<Output = bool>,
        web_socket: &Arc<MockWebSocket>,
    ) -> bool {
        let next_open = self.connections.web_socket_request_count();
        assert!(
            self.connections
                .wait_for_web_socket_requests(next_open + 1)
                .await,
            "no stream open request"
        );
        self.connections
            .respond_to_web_socket_request(next_open, Some(Arc::clone(web_socket) as Arc<dyn WebSocket>));
        assert!(
            web_socket.wait_for_callbacks().await,
            "stream callbacks never registered"
        );
        web_socket.deliver_text(&hello_frame(HEARTBEAT_INTERVAL_MS));
        tokio::time::timeout(Duration::from_secs(1), connected)
            .await
            .expect("connect future did not resolve")
    }
}

/// Give background tasks a moment to run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
