//! Inkwire Core Library
//!
//! Platform-agnostic stroke capture, smoothing and synchronization for the
//! Inkwire collaborative whiteboard.

pub mod curve;
pub mod protocol;
pub mod sampler;
pub mod session;
pub mod smoother;
pub mod sync;
pub mod tools;

pub use curve::{StrokeSurface, draw_stroke, stroke_path};
pub use protocol::{ChatMessage, EventKind, StrokeSegment, WireEvent, peek_event};
pub use sampler::{PointSampler, StrokeBuffer, TimedPoint};
pub use session::DrawingSession;
pub use smoother::{control_points, estimate_speed};
pub use sync::{ConnectionState, PlatformWebSocket, SyncEvent, TransportError, connect_url};
pub use tools::{CompositeMode, DrawingState, ResolvedStyle, ToolKind};
