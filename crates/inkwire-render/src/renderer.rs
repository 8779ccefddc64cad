//! Renderer trait abstraction.

use inkwire_core::curve::StrokeSurface;
use peniko::Color;
use peniko::color::{Srgb, parse_color};
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid color {value:?}: {reason}")]
    InvalidColor { value: String, reason: String },
}

/// Parse a CSS color as sent on the wire: `#rgb`, `#rrggbb`, `rgb()`,
/// `rgba()`, named colors and the rest of CSS Color 4.
pub fn parse_css_color(value: &str) -> Result<Color, RendererError> {
    parse_color(value.trim())
        .map(|c| c.to_alpha_color::<Srgb>())
        .map_err(|e| RendererError::InvalidColor {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// A stroke surface that keeps what it has drawn.
///
/// Like a canvas bitmap, strokes accumulate until cleared; there is no
/// per-stroke undo.
pub trait Renderer: StrokeSurface {
    /// Discard everything drawn so far.
    fn clear(&mut self);

    /// Number of strokes drawn since the last clear.
    fn stroke_count(&self) -> usize;
}
