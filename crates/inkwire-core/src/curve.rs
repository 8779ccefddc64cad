//! Quadratic curve construction through stroke control points.

use kurbo::{BezPath, Point};

use crate::sampler::TimedPoint;
use crate::tools::ResolvedStyle;

/// A drawing target for stroked paths.
///
/// Implementations paint with round caps and joins for every tool and
/// honor [`ResolvedStyle::composite`].
pub trait StrokeSurface {
    /// Stroke `path` with `style`.
    fn stroke_path(&mut self, path: &BezPath, style: &ResolvedStyle);
}

fn midpoint(a: &TimedPoint, b: &TimedPoint) -> Point {
    a.position().midpoint(b.position())
}

/// Build the smooth path through `points`.
///
/// Starts at the first point; each interior point from index 1 to `len - 3`
/// becomes the handle of a quadratic ending at the midpoint to its
/// successor, and a final quadratic uses the second-to-last point as handle
/// and ends on the last point. Returns `None` for fewer than two points.
pub fn stroke_path(points: &[TimedPoint]) -> Option<BezPath> {
    if points.len() < 2 {
        return None;
    }

    let mut path = BezPath::new();
    path.move_to(points[0].position());

    let n = points.len();
    for i in 1..n.saturating_sub(2) {
        path.quad_to(points[i].position(), midpoint(&points[i], &points[i + 1]));
    }
    path.quad_to(points[n - 2].position(), points[n - 1].position());

    Some(path)
}

/// Draw `points` onto `surface`. Returns whether a command was issued.
pub fn draw_stroke<S: StrokeSurface + ?Sized>(
    surface: &mut S,
    points: &[TimedPoint],
    style: &ResolvedStyle,
) -> bool {
    match stroke_path(points) {
        Some(path) => {
            surface.stroke_path(&path, style);
            true
        }
        None => false,
    }
}
