//! Vello-based stroke surface.

use crate::renderer::{Renderer, parse_css_color};
use inkwire_core::curve::StrokeSurface;
use inkwire_core::tools::{CompositeMode, ResolvedStyle};
use kurbo::{Affine, BezPath, Cap, Join, Shape as KurboShape, Stroke};
use peniko::{BlendMode, Color, Compose, Mix};
use vello::Scene;

/// Records strokes into a Vello scene.
///
/// The scene is retained between strokes, so a host renders it each frame
/// the way a canvas element keeps its bitmap.
pub struct VelloSurface {
    /// The Vello scene being built.
    scene: Scene,
    /// Canvas-to-device transform (HiDPI scaling, panning).
    transform: Affine,
    strokes: usize,
}

impl Default for VelloSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl VelloSurface {
    /// Create an empty surface.
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            transform: Affine::IDENTITY,
            strokes: 0,
        }
    }

    /// Set the canvas-to-device transform used for later strokes.
    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        self.strokes = 0;
        std::mem::take(&mut self.scene)
    }

    fn stroke_color(color: &str) -> Color {
        parse_css_color(color).unwrap_or_else(|e| {
            log::warn!("{}, drawing in black", e);
            Color::BLACK
        })
    }
}

impl StrokeSurface for VelloSurface {
    fn stroke_path(&mut self, path: &BezPath, style: &ResolvedStyle) {
        let stroke = Stroke::new(style.line_width)
            .with_caps(Cap::Round)
            .with_join(Join::Round);

        match style.composite {
            CompositeMode::SourceOver => {
                let color = Self::stroke_color(&style.color);
                self.scene.stroke(&stroke, self.transform, color, None, path);
            }
            CompositeMode::DestinationOut => {
                // Erase by compositing an opaque stroke layer with DestOut
                let clip = path
                    .bounding_box()
                    .inflate(style.line_width, style.line_width);
                self.scene.push_layer(
                    BlendMode::new(Mix::Normal, Compose::DestOut),
                    1.0,
                    self.transform,
                    &clip,
                );
                self.scene.stroke(&stroke, self.transform, Color::BLACK, None, path);
                self.scene.pop_layer();
            }
        }
        self.strokes += 1;
    }
}

impl Renderer for VelloSurface {
    fn clear(&mut self) {
        self.scene.reset();
        self.strokes = 0;
    }

    fn stroke_count(&self) -> usize {
        self.strokes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwire_core::curve::draw_stroke;
    use inkwire_core::sampler::TimedPoint;
    use inkwire_core::tools::{DrawingState, ToolKind};

    fn zigzag() -> Vec<TimedPoint> {
        vec![
            TimedPoint::new(0.0, 0.0, 0.0),
            TimedPoint::new(10.0, 20.0, 8.0),
            TimedPoint::new(20.0, 0.0, 16.0),
            TimedPoint::new(30.0, 20.0, 24.0),
        ]
    }

    #[test]
    fn test_surface_creation() {
        let surface = VelloSurface::new();
        assert!(surface.scene().encoding().is_empty());
        assert_eq!(surface.stroke_count(), 0);
    }

    #[test]
    fn test_paint_stroke() {
        let mut surface = VelloSurface::new();
        let style = DrawingState::new().stroke_style();
        assert!(draw_stroke(&mut surface, &zigzag(), &style));
        assert!(!surface.scene().encoding().is_empty());
        assert_eq!(surface.stroke_count(), 1);
    }

    #[test]
    fn test_erase_stroke() {
        let mut surface = VelloSurface::new();
        let mut state = DrawingState::new();
        state.set_tool(ToolKind::Eraser);
        assert!(draw_stroke(&mut surface, &zigzag(), &state.stroke_style()));
        assert!(!surface.scene().encoding().is_empty());
        assert_eq!(surface.stroke_count(), 1);
    }

    #[test]
    fn test_degenerate_stroke_draws_nothing() {
        let mut surface = VelloSurface::new();
        let style = DrawingState::new().stroke_style();
        assert!(!draw_stroke(&mut surface, &zigzag()[..1], &style));
        assert!(surface.scene().encoding().is_empty());
    }

    #[test]
    fn test_clear() {
        let mut surface = VelloSurface::new();
        let style = DrawingState::new().stroke_style();
        draw_stroke(&mut surface, &zigzag(), &style);
        surface.clear();
        assert!(surface.scene().encoding().is_empty());
        assert_eq!(surface.stroke_count(), 0);
    }

    #[test]
    fn test_unparseable_color_still_draws() {
        let mut surface = VelloSurface::new();
        let style = ResolvedStyle::for_tool(ToolKind::Pencil, "???", 3.0);
        assert!(draw_stroke(&mut surface, &zigzag(), &style));
        assert_eq!(surface.stroke_count(), 1);
    }
}
