//! Drawing tools and the styles they resolve to.

use serde::{Deserialize, Serialize};

/// Fixed stroke color of the highlighter, whatever color is selected.
pub const HIGHLIGHTER_COLOR: &str = "rgba(255, 255, 0, 0.4)";
/// Fixed highlighter width.
pub const HIGHLIGHTER_WIDTH: f64 = 15.0;
/// Speed at and above which pressure-simulating tools reach their minimum width.
pub const MAX_SPEED: f64 = 500.0;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Pencil,
    Brush,
    Highlighter,
    Eraser,
}

impl ToolKind {
    /// Width range `(at rest, at full speed)` for speed-sensitive tools.
    fn width_range(self) -> Option<(f64, f64)> {
        match self {
            ToolKind::Pencil => Some((10.0, 1.0)),
            ToolKind::Brush => Some((25.0, 5.0)),
            ToolKind::Highlighter | ToolKind::Eraser => None,
        }
    }
}

/// Pixel blending rule applied while rendering a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// Paint over existing pixels.
    #[default]
    SourceOver,
    /// Remove existing pixels under the stroke.
    DestinationOut,
}

impl CompositeMode {
    /// The matching canvas `globalCompositeOperation` value.
    pub fn css_name(self) -> &'static str {
        match self {
            CompositeMode::SourceOver => "source-over",
            CompositeMode::DestinationOut => "destination-out",
        }
    }
}

/// Everything the curve renderer needs to know about how to stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub line_width: f64,
    pub composite: CompositeMode,
    /// CSS color string.
    pub color: String,
}

impl ResolvedStyle {
    /// Style for a tool at an already-known width.
    ///
    /// The highlighter overrides the color; the eraser switches to
    /// destination-out and keeps the color only for the wire.
    pub fn for_tool(tool: ToolKind, color: &str, line_width: f64) -> Self {
        match tool {
            ToolKind::Eraser => Self {
                line_width,
                composite: CompositeMode::DestinationOut,
                color: color.to_string(),
            },
            ToolKind::Highlighter => Self {
                line_width,
                composite: CompositeMode::SourceOver,
                color: HIGHLIGHTER_COLOR.to_string(),
            },
            ToolKind::Pencil | ToolKind::Brush => Self {
                line_width,
                composite: CompositeMode::SourceOver,
                color: color.to_string(),
            },
        }
    }
}

/// Width of a stroke for `tool` drawn at `speed`.
///
/// Pencil and brush thin out linearly as speed rises to [`MAX_SPEED`]; the
/// highlighter is fixed and the eraser uses the manual size.
pub fn line_width(tool: ToolKind, speed: f64, manual_width: f64) -> f64 {
    match tool.width_range() {
        Some((at_rest, at_speed)) => {
            let t = (speed.clamp(0.0, MAX_SPEED)) / MAX_SPEED;
            at_rest - (at_rest - at_speed) * t
        }
        None if tool == ToolKind::Highlighter => HIGHLIGHTER_WIDTH,
        None => manual_width,
    }
}

/// Resolve the style for the local tool at the current drawing speed.
pub fn resolve(state: &DrawingState, speed: f64) -> ResolvedStyle {
    let width = line_width(state.tool, speed, state.line_width);
    ResolvedStyle::for_tool(state.tool, &state.color, width)
}

/// Tool, color and size chosen in the UI for one drawing session.
///
/// Owned by the UI layer and handed by reference to the stroke pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingState {
    tool: ToolKind,
    color: String,
    /// Manual size control; the eraser width.
    line_width: f64,
}

impl Default for DrawingState {
    fn default() -> Self {
        Self {
            tool: ToolKind::default(),
            color: "black".to_string(),
            line_width: 5.0,
        }
    }
}

impl DrawingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn line_width(&self) -> f64 {
        self.line_width
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    /// Change the selected color. Ignored while erasing; returns whether the
    /// color changed.
    pub fn set_color(&mut self, color: impl Into<String>) -> bool {
        if self.tool == ToolKind::Eraser {
            return false;
        }
        self.color = color.into();
        true
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
    }

    /// Style for the current values with the width taken as-is.
    pub fn stroke_style(&self) -> ResolvedStyle {
        ResolvedStyle::for_tool(self.tool, &self.color, self.line_width)
    }

    /// Run `f` with `tool`, `color` and `line_width` temporarily substituted,
    /// then put the local values back.
    pub fn with_substituted<R>(
        &mut self,
        tool: ToolKind,
        color: &str,
        line_width: f64,
        f: impl FnOnce(&DrawingState) -> R,
    ) -> R {
        let saved = std::mem::replace(
            self,
            DrawingState {
                tool,
                color: color.to_string(),
                line_width,
            },
        );
        let result = f(self);
        *self = saved;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn width_at(tool: ToolKind, speed: f64) -> f64 {
        line_width(tool, speed, 7.0)
    }

    #[test]
    fn test_pencil_width_bounds() {
        assert_eq!(width_at(ToolKind::Pencil, 0.0), 10.0);
        assert_eq!(width_at(ToolKind::Pencil, -20.0), 10.0);
        assert_eq!(width_at(ToolKind::Pencil, 500.0), 1.0);
        assert_eq!(width_at(ToolKind::Pencil, 9000.0), 1.0);
    }

    #[test]
    fn test_pencil_width_monotonic() {
        let mut previous = width_at(ToolKind::Pencil, 0.0);
        for s in 1..500 {
            let w = width_at(ToolKind::Pencil, s as f64);
            assert!(w > 1.0 && w < 10.0, "width {} at speed {}", w, s);
            assert!(w <= previous);
            previous = w;
        }
    }

    #[test]
    fn test_brush_width_bounds() {
        assert_eq!(width_at(ToolKind::Brush, 0.0), 25.0);
        assert_eq!(width_at(ToolKind::Brush, 500.0), 5.0);
        assert_eq!(width_at(ToolKind::Brush, 250.0), 15.0);
    }

    #[test]
    fn test_highlighter_fixed() {
        let mut state = DrawingState::new();
        state.set_tool(ToolKind::Highlighter);
        state.set_color("#ff0000");
        for speed in [0.0, 42.0, 500.0, 10_000.0] {
            let style = resolve(&state, speed);
            assert_eq!(style.line_width, 15.0);
            assert_eq!(style.color, HIGHLIGHTER_COLOR);
            assert_eq!(style.composite, CompositeMode::SourceOver);
        }
    }

    #[test]
    fn test_eraser_uses_manual_width() {
        let mut state = DrawingState::new();
        state.set_line_width(32.0);
        state.set_tool(ToolKind::Eraser);
        let style = resolve(&state, 300.0);
        assert_eq!(style.line_width, 32.0);
        assert_eq!(style.composite, CompositeMode::DestinationOut);
        assert_eq!(style.composite.css_name(), "destination-out");
    }

    #[test]
    fn test_pencil_keeps_selected_color() {
        let mut state = DrawingState::new();
        state.set_color("#123456");
        let style = resolve(&state, 0.0);
        assert_eq!(style.color, "#123456");
        assert_eq!(style.composite, CompositeMode::SourceOver);
    }

    #[test]
    fn test_color_locked_while_erasing() {
        let mut state = DrawingState::new();
        state.set_color("red");
        state.set_tool(ToolKind::Eraser);
        assert!(!state.set_color("blue"));
        assert_eq!(state.color(), "red");

        state.set_tool(ToolKind::Brush);
        assert!(state.set_color("blue"));
        assert_eq!(state.color(), "blue");
    }

    #[test]
    fn test_substitution_restores_local_state() {
        let mut state = DrawingState::new();
        state.set_color("green");
        state.set_line_width(4.0);
        let before = state.clone();

        let style = state.with_substituted(ToolKind::Eraser, "#000", 12.0, |s| s.stroke_style());
        assert_eq!(style.line_width, 12.0);
        assert_eq!(style.composite, CompositeMode::DestinationOut);
        assert_eq!(state, before);
    }

    #[test]
    fn test_tool_serde_lowercase() {
        assert_eq!(serde_json::to_string(&ToolKind::Highlighter).unwrap(), "\"highlighter\"");
        let tool: ToolKind = serde_json::from_str("\"eraser\"").unwrap();
        assert_eq!(tool, ToolKind::Eraser);
    }
}
