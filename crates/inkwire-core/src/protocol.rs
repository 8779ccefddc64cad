//! Wire events exchanged with the relay server.
//!
//! Every frame is a JSON text message:
//!
//! ```json
//! { "event": "drawing", "data": { "points": [{"x": 0, "y": 0, "time": 0}], "color": "#000", "lineWidth": 3, "tool": "pencil" } }
//! { "event": "chat", "data": { "text": "hi" } }
//! ```
//!
//! Delivery is fire-and-forget. Segments from one sender arrive in the order
//! they were sent; segments from different senders have no relative order,
//! and nothing detects or repairs loss.

use serde::{Deserialize, Serialize};

use crate::sampler::TimedPoint;
use crate::tools::ToolKind;

/// Canonical event name for stroke segments.
pub const DRAWING_EVENT: &str = "drawing";
/// Older front ends emit stroke segments under this name.
pub const LEGACY_DRAW_EVENT: &str = "draw";
pub const CHAT_EVENT: &str = "chat";

/// One incremental piece of a stroke, sent once per pointer move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeSegment {
    pub points: Vec<TimedPoint>,
    pub color: String,
    pub line_width: f64,
    pub tool: ToolKind,
}

/// A chat line shared with the rest of the group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// A frame on the drawing channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WireEvent {
    #[serde(alias = "draw")]
    Drawing(StrokeSegment),
    Chat(ChatMessage),
}

impl WireEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Relayed event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Drawing,
    Chat,
}

impl EventKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            DRAWING_EVENT | LEGACY_DRAW_EVENT => Some(EventKind::Drawing),
            CHAT_EVENT => Some(EventKind::Chat),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct EventHeader {
    event: String,
}

/// Read only the event name of a frame, leaving the payload untouched.
///
/// `Ok(None)` means a well-formed frame with an event name nobody relays.
pub fn peek_event(text: &str) -> Result<Option<EventKind>, serde_json::Error> {
    let header: EventHeader = serde_json::from_str(text)?;
    Ok(EventKind::from_name(&header.event))
}
