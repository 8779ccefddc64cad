//! Per-tab drawing session.
//!
//! Bridges pointer input, local rendering and the drawing channel. Outgoing
//! frames are queued as JSON strings and drained by whoever owns the socket.

use crate::curve::{StrokeSurface, draw_stroke};
use crate::protocol::{ChatMessage, StrokeSegment, WireEvent};
use crate::sampler::{PointSampler, TimedPoint};
use crate::smoother::{control_points, estimate_speed};
use crate::sync::{ConnectionState, PlatformWebSocket, SyncEvent};
use crate::tools::{self, DrawingState};

/// Drawing state, the stroke in progress and the queue of frames to send.
pub struct DrawingSession {
    /// Tool, color and size selected in the UI.
    state: DrawingState,
    sampler: PointSampler,
    /// Pending outgoing messages (JSON strings).
    outgoing: Vec<String>,
    /// Chat messages received since the last `take_chat()`.
    chat: Vec<ChatMessage>,
    connection: ConnectionState,
}

impl Default for DrawingSession {
    fn default() -> Self {
        Self::new(DrawingState::default())
    }
}

impl DrawingSession {
    pub fn new(state: DrawingState) -> Self {
        Self {
            state,
            sampler: PointSampler::new(),
            outgoing: Vec::new(),
            chat: Vec::new(),
            connection: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> &DrawingState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DrawingState {
        &mut self.state
    }

    pub fn is_drawing(&self) -> bool {
        self.sampler.is_active()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    // --- Pointer input ---

    pub fn pointer_down(&mut self, point: TimedPoint) {
        self.sampler.begin(point);
    }

    /// Handle a pointer move.
    ///
    /// While a stroke is active this draws the stroke so far onto `surface`
    /// and queues exactly one segment for the peers, which is also returned.
    pub fn pointer_move<S: StrokeSurface + ?Sized>(
        &mut self,
        point: TimedPoint,
        surface: &mut S,
    ) -> Option<StrokeSegment> {
        if !self.sampler.sample(point) {
            return None;
        }

        let points = self.sampler.buffer().points();
        let anchors = control_points(points);
        let speed = estimate_speed(points);
        let style = tools::resolve(&self.state, speed);

        draw_stroke(surface, &anchors, &style);

        let segment = StrokeSegment {
            points: anchors,
            color: self.state.color().to_string(),
            line_width: style.line_width,
            tool: self.state.tool(),
        };
        self.queue(&WireEvent::Drawing(segment.clone()));
        Some(segment)
    }

    pub fn pointer_up(&mut self) {
        self.sampler.end();
    }

    pub fn pointer_leave(&mut self) {
        self.sampler.end();
    }

    // --- Chat ---

    pub fn send_chat(&mut self, text: impl Into<String>, author: Option<String>) {
        self.queue(&WireEvent::Chat(ChatMessage {
            text: text.into(),
            author,
        }));
    }

    pub fn take_chat(&mut self) -> Vec<ChatMessage> {
        std::mem::take(&mut self.chat)
    }

    // --- Network ---

    fn queue(&mut self, event: &WireEvent) {
        match event.to_json() {
            Ok(json) => self.outgoing.push(json),
            Err(e) => log::error!("Failed to encode event: {}", e),
        }
    }

    /// Take the pending outgoing frames.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outgoing)
    }

    /// Check if there are pending outgoing frames.
    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Apply an event from the socket.
    ///
    /// Remote strokes go through the same draw routine as local ones, with
    /// the segment's tool, color and width substituted for the duration of
    /// the call. The local stroke in progress is not touched.
    pub fn handle_event<S: StrokeSurface + ?Sized>(&mut self, event: SyncEvent, surface: &mut S) {
        match event {
            SyncEvent::Connected => {
                log::info!("Drawing channel connected");
                self.connection = ConnectionState::Connected;
            }
            SyncEvent::Disconnected => {
                log::info!("Drawing channel disconnected");
                self.connection = ConnectionState::Disconnected;
            }
            SyncEvent::StrokeReceived(segment) => {
                self.state.with_substituted(segment.tool, &segment.color, segment.line_width, |state| {
                    draw_stroke(surface, &segment.points, &state.stroke_style())
                });
            }
            SyncEvent::ChatReceived(message) => self.chat.push(message),
            SyncEvent::Malformed { message } => {
                log::warn!("Dropping peer frame: {}", message);
            }
            SyncEvent::Error { message } => {
                log::warn!("Drawing channel error: {}", message);
                self.connection = ConnectionState::Error;
            }
        }
    }

    /// Flush queued frames to `socket` and apply whatever it received.
    ///
    /// Frames that fail to send are dropped; segments are never resent.
    pub fn pump<S: StrokeSurface + ?Sized>(&mut self, socket: &mut PlatformWebSocket, surface: &mut S) {
        if socket.is_connected() {
            for frame in self.take_outgoing() {
                if let Err(e) = socket.send(&frame) {
                    log::warn!("Dropping frame: {}", e);
                }
            }
        }
        for event in socket.poll_events() {
            self.handle_event(event, surface);
        }
    }
}
