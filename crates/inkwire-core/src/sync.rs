//! WebSocket client for the drawing channel.
//!
//! Provides a platform-agnostic client interface for connecting to the relay
//! server. Both clients are polled: incoming frames are decoded into
//! [`SyncEvent`]s and collected until `poll_events()` drains them.

use thiserror::Error;
use url::Url;

use crate::protocol::WireEvent;

/// Query parameter carrying the routing identifier.
pub const USER_ID_PARAM: &str = "userId";

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the WebSocket client
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Connected to server
    Connected,
    /// Disconnected from server
    Disconnected,
    /// A peer's stroke segment
    StrokeReceived(crate::protocol::StrokeSegment),
    /// A peer's chat message
    ChatReceived(crate::protocol::ChatMessage),
    /// A frame that could not be decoded; the connection stays up
    Malformed { message: String },
    /// Error occurred
    Error { message: String },
}

/// Client transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Invalid WebSocket URL scheme: {0}")]
    InvalidScheme(String),
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("Failed to create WebSocket: {0}")]
    Create(String),
}

/// Parse `url` and require a `ws` or `wss` scheme.
fn parse_ws_url(url: &str) -> Result<Url, TransportError> {
    let url = Url::parse(url)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(TransportError::InvalidScheme(other.to_string())),
    }
}

/// Build the endpoint URL for `user_id`, e.g. `ws://host:3030/ws?userId=42`.
pub fn connect_url(endpoint: &str, user_id: &str) -> Result<String, TransportError> {
    let mut url = parse_ws_url(endpoint)?;
    url.query_pairs_mut().append_pair(USER_ID_PARAM, user_id);
    Ok(url.into())
}

/// At most the first 100 characters of a frame, for logging.
fn preview(text: &str) -> &str {
    match text.char_indices().nth(100) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Decode a text frame from the server.
///
/// Frames with an unknown event name yield `None`; unreadable frames become
/// [`SyncEvent::Malformed`].
pub fn decode_frame(text: &str) -> Option<SyncEvent> {
    match crate::protocol::peek_event(text) {
        Ok(None) => {
            log::debug!("Ignoring unknown event: {}", preview(text));
            None
        }
        Ok(Some(_)) => match WireEvent::from_json(text) {
            Ok(WireEvent::Drawing(segment)) => Some(SyncEvent::StrokeReceived(segment)),
            Ok(WireEvent::Chat(message)) => Some(SyncEvent::ChatReceived(message)),
            Err(e) => Some(SyncEvent::Malformed {
                message: format!("Malformed event: {}", e),
            }),
        },
        Err(e) => Some(SyncEvent::Malformed {
            message: format!("Malformed frame: {}", e),
        }),
    }
}

/// The connection state `event` moves a client into, if any.
fn state_after(event: &SyncEvent) -> Option<ConnectionState> {
    match event {
        SyncEvent::Connected => Some(ConnectionState::Connected),
        SyncEvent::Disconnected => Some(ConnectionState::Disconnected),
        SyncEvent::Error { .. } => Some(ConnectionState::Error),
        _ => None,
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_client {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{CloseEvent, ErrorEvent, MessageEvent, WebSocket};

    type Inbox = Rc<RefCell<Vec<SyncEvent>>>;

    /// Callbacks registered on the browser socket. They must live as long
    /// as the socket can fire them.
    struct Handlers {
        _open: Closure<dyn Fn()>,
        _message: Closure<dyn Fn(MessageEvent)>,
        _close: Closure<dyn Fn(CloseEvent)>,
        _error: Closure<dyn Fn(ErrorEvent)>,
    }

    impl Handlers {
        fn attach(ws: &WebSocket, inbox: &Inbox) -> Self {
            let open = {
                let inbox = inbox.clone();
                Closure::wrap(Box::new(move || {
                    inbox.borrow_mut().push(SyncEvent::Connected);
                }) as Box<dyn Fn()>)
            };
            let message = {
                let inbox = inbox.clone();
                Closure::wrap(Box::new(move |e: MessageEvent| {
                    // Binary frames are not part of the protocol
                    let Ok(text) = e.data().dyn_into::<js_sys::JsString>() else {
                        return;
                    };
                    if let Some(event) = decode_frame(&String::from(text)) {
                        inbox.borrow_mut().push(event);
                    }
                }) as Box<dyn Fn(MessageEvent)>)
            };
            let close = {
                let inbox = inbox.clone();
                Closure::wrap(Box::new(move |_e: CloseEvent| {
                    inbox.borrow_mut().push(SyncEvent::Disconnected);
                }) as Box<dyn Fn(CloseEvent)>)
            };
            let error = {
                let inbox = inbox.clone();
                Closure::wrap(Box::new(move |_e: ErrorEvent| {
                    inbox.borrow_mut().push(SyncEvent::Error {
                        message: "WebSocket error".to_string(),
                    });
                }) as Box<dyn Fn(ErrorEvent)>)
            };

            ws.set_onopen(Some(open.as_ref().unchecked_ref()));
            ws.set_onmessage(Some(message.as_ref().unchecked_ref()));
            ws.set_onclose(Some(close.as_ref().unchecked_ref()));
            ws.set_onerror(Some(error.as_ref().unchecked_ref()));

            Self {
                _open: open,
                _message: message,
                _close: close,
                _error: error,
            }
        }

        fn detach(ws: &WebSocket) {
            ws.set_onopen(None);
            ws.set_onmessage(None);
            ws.set_onclose(None);
            ws.set_onerror(None);
        }
    }

    /// Drawing channel client on the browser `WebSocket`.
    ///
    /// Socket callbacks fill an inbox that [`WasmWebSocket::poll_events`]
    /// drains from the frame loop.
    pub struct WasmWebSocket {
        ws: Option<WebSocket>,
        handlers: Option<Handlers>,
        inbox: Inbox,
        state: ConnectionState,
    }

    impl WasmWebSocket {
        pub fn new() -> Self {
            Self {
                ws: None,
                handlers: None,
                inbox: Rc::new(RefCell::new(Vec::new())),
                state: ConnectionState::Disconnected,
            }
        }

        pub fn connect(&mut self, url: &str) -> Result<(), TransportError> {
            if self.ws.is_some() {
                return Err(TransportError::AlreadyConnected);
            }
            let url = parse_ws_url(url)?;

            let ws = WebSocket::new(url.as_str())
                .map_err(|e| TransportError::Create(format!("{:?}", e)))?;
            ws.set_binary_type(web_sys::BinaryType::Arraybuffer);

            self.handlers = Some(Handlers::attach(&ws, &self.inbox));
            self.ws = Some(ws);
            self.state = ConnectionState::Connecting;
            Ok(())
        }

        pub fn disconnect(&mut self) {
            if let Some(ws) = self.ws.take() {
                Handlers::detach(&ws);
                let _ = ws.close();
            }
            self.handlers = None;
            self.state = ConnectionState::Disconnected;
        }

        pub fn send(&self, msg: &str) -> Result<(), TransportError> {
            let ws = self.ws.as_ref().ok_or(TransportError::NotConnected)?;
            ws.send_with_str(msg)
                .map_err(|e| TransportError::SendFailed(format!("{:?}", e)))
        }

        /// Drain everything the socket reported since the last poll.
        pub fn poll_events(&mut self) -> Vec<SyncEvent> {
            let events = std::mem::take(&mut *self.inbox.borrow_mut());
            for event in &events {
                if let Some(state) = state_after(event) {
                    self.state = state;
                }
            }
            events
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl Default for WasmWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_client::WasmWebSocket;

#[cfg(not(target_arch = "wasm32"))]
mod native_client {
    use super::*;
    use std::io::ErrorKind;
    use std::net::TcpStream;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread;
    use std::time::Duration;
    use tungstenite::stream::MaybeTlsStream;
    use tungstenite::{Message, WebSocket};

    /// Longest a read blocks before the worker looks for frames to send.
    const READ_POLL: Duration = Duration::from_millis(20);
    const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

    type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

    enum Command {
        Frame(String),
        Close,
    }

    /// Drawing channel client backed by a tungstenite worker thread.
    ///
    /// The worker owns the socket. This handle only talks to it over
    /// channels, so `send` and `poll_events` never block.
    pub struct NativeWebSocket {
        commands: Option<Sender<Command>>,
        inbox: Option<Receiver<SyncEvent>>,
        state: ConnectionState,
    }

    impl NativeWebSocket {
        pub fn new() -> Self {
            Self {
                commands: None,
                inbox: None,
                state: ConnectionState::Disconnected,
            }
        }

        /// Start connecting to `url` in the background. Completion arrives
        /// as [`SyncEvent::Connected`] or [`SyncEvent::Error`].
        pub fn connect(&mut self, url: &str) -> Result<(), TransportError> {
            if self.commands.is_some() {
                return Err(TransportError::AlreadyConnected);
            }
            let url: String = parse_ws_url(url)?.into();

            let (command_tx, command_rx) = channel();
            let (event_tx, event_rx) = channel();
            thread::Builder::new()
                .name("inkwire-ws".to_string())
                .spawn(move || run_worker(url, command_rx, event_tx))
                .map_err(|e| TransportError::Create(e.to_string()))?;

            self.commands = Some(command_tx);
            self.inbox = Some(event_rx);
            self.state = ConnectionState::Connecting;
            Ok(())
        }

        pub fn disconnect(&mut self) {
            if let Some(commands) = self.commands.take() {
                let _ = commands.send(Command::Close);
            }
            self.inbox = None;
            self.state = ConnectionState::Disconnected;
        }

        pub fn send(&self, msg: &str) -> Result<(), TransportError> {
            let commands = self.commands.as_ref().ok_or(TransportError::NotConnected)?;
            commands
                .send(Command::Frame(msg.to_string()))
                .map_err(|e| TransportError::SendFailed(e.to_string()))
        }

        /// Drain everything the worker reported since the last poll.
        pub fn poll_events(&mut self) -> Vec<SyncEvent> {
            let Some(inbox) = &self.inbox else {
                return Vec::new();
            };
            let events: Vec<SyncEvent> = inbox.try_iter().collect();
            for event in &events {
                if let Some(state) = state_after(event) {
                    self.state = state;
                }
            }
            events
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl Default for NativeWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativeWebSocket {
        fn drop(&mut self) {
            self.disconnect();
        }
    }

    fn run_worker(url: String, commands: Receiver<Command>, events: Sender<SyncEvent>) {
        log::info!("Connecting drawing channel to {}", url);
        let mut socket = match tungstenite::connect(url.as_str()) {
            Ok((socket, response)) => {
                log::info!("Drawing channel open, status {}", response.status());
                socket
            }
            Err(e) => {
                log::error!("Drawing channel connect to {} failed: {}", url, e);
                let _ = events.send(SyncEvent::Error {
                    message: format!("Connection failed: {}", e),
                });
                return;
            }
        };

        if let MaybeTlsStream::Plain(tcp) = socket.get_mut() {
            let _ = tcp.set_read_timeout(Some(READ_POLL));
            let _ = tcp.set_write_timeout(Some(WRITE_TIMEOUT));
        }
        let _ = events.send(SyncEvent::Connected);

        while flush_commands(&mut socket, &commands) && read_once(&mut socket, &events) {}

        log::info!("Drawing channel closed");
        let _ = events.send(SyncEvent::Disconnected);
    }

    /// Send every queued frame. Returns false once the worker should stop.
    fn flush_commands(socket: &mut Socket, commands: &Receiver<Command>) -> bool {
        loop {
            match commands.try_recv() {
                Ok(Command::Frame(text)) => {
                    log::debug!("Sending: {}", preview(&text));
                    if let Err(e) = socket.send(Message::Text(text)) {
                        log::error!("Drawing channel send failed: {}", e);
                        return false;
                    }
                }
                Ok(Command::Close) | Err(TryRecvError::Disconnected) => {
                    let _ = socket.close(None);
                    return false;
                }
                Err(TryRecvError::Empty) => return true,
            }
        }
    }

    /// Wait up to [`READ_POLL`] for one frame. Returns false once the socket
    /// is done.
    fn read_once(socket: &mut Socket, events: &Sender<SyncEvent>) -> bool {
        match socket.read() {
            Ok(Message::Text(text)) => {
                log::debug!("Received: {}", preview(&text));
                if let Some(event) = decode_frame(&text) {
                    let _ = events.send(event);
                }
                true
            }
            Ok(Message::Close(frame)) => {
                log::info!("Server closed the drawing channel: {:?}", frame);
                false
            }
            // Pings are answered inside tungstenite
            Ok(_) => true,
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                true
            }
            Err(e) => {
                log::error!("Drawing channel read failed: {}", e);
                false
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_client::NativeWebSocket;

/// Platform-specific WebSocket client type.
#[cfg(target_arch = "wasm32")]
pub type PlatformWebSocket = WasmWebSocket;

#[cfg(not(target_arch = "wasm32"))]
pub type PlatformWebSocket = NativeWebSocket;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolKind;

    #[test]
    fn test_connect_url() {
        let url = connect_url("ws://localhost:3030/ws", "42").unwrap();
        assert_eq!(url, "ws://localhost:3030/ws?userId=42");
    }

    #[test]
    fn test_connect_url_encodes_id() {
        let url = connect_url("wss://example.com/ws", "a b&c").unwrap();
        assert_eq!(url, "wss://example.com/ws?userId=a+b%26c");
    }

    #[test]
    fn test_connect_url_rejects_http() {
        assert!(matches!(
            connect_url("http://localhost/ws", "1"),
            Err(TransportError::InvalidScheme(_))
        ));
        assert!(matches!(connect_url("not a url", "1"), Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_decode_drawing_frame() {
        let json = r##"{"event":"drawing","data":{"points":[{"x":1,"y":2,"time":3},{"x":4,"y":5,"time":6}],"color":"#f00","lineWidth":2.5,"tool":"brush"}}"##;
        match decode_frame(json) {
            Some(SyncEvent::StrokeReceived(segment)) => {
                assert_eq!(segment.points.len(), 2);
                assert_eq!(segment.tool, ToolKind::Brush);
                assert_eq!(segment.line_width, 2.5);
            }
            other => panic!("Wrong event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_and_malformed() {
        assert_eq!(decode_frame(r#"{"event":"cursor","data":{}}"#), None);
        assert!(matches!(decode_frame("{"), Some(SyncEvent::Malformed { .. })));
        assert!(matches!(
            decode_frame(r#"{"event":"drawing","data":{"points":"nope"}}"#),
            Some(SyncEvent::Malformed { .. })
        ));
    }

    #[test]
    fn test_send_requires_connection() {
        let mut socket = NativeWebSocket::new();
        assert!(matches!(socket.send("{}"), Err(TransportError::NotConnected)));
        assert_eq!(socket.state(), ConnectionState::Disconnected);
        assert!(socket.poll_events().is_empty());
    }

    #[test]
    fn test_connect_rejects_scheme_before_spawning() {
        let mut socket = NativeWebSocket::new();
        assert!(matches!(
            socket.connect("https://localhost/ws"),
            Err(TransportError::InvalidScheme(_))
        ));
        assert_eq!(socket.state(), ConnectionState::Disconnected);
        assert!(matches!(socket.send("{}"), Err(TransportError::NotConnected)));
    }

    #[test]
    fn test_state_after_events() {
        assert_eq!(state_after(&SyncEvent::Connected), Some(ConnectionState::Connected));
        assert_eq!(state_after(&SyncEvent::Disconnected), Some(ConnectionState::Disconnected));
        assert_eq!(
            state_after(&SyncEvent::Error {
                message: "reset".to_string()
            }),
            Some(ConnectionState::Error)
        );
        assert_eq!(
            state_after(&SyncEvent::Malformed {
                message: "bad".to_string()
            }),
            None
        );
    }
}
