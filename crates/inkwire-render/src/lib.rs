//! Inkwire Render Library
//!
//! Drawing surfaces for Inkwire strokes.
//! The default implementation records into a Vello scene.

mod renderer;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use renderer::{Renderer, RendererError, parse_css_color};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloSurface;
