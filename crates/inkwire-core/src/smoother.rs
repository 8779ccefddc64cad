//! Control-point selection and speed estimation for a growing stroke.
//!
//! Smoothing here is a selection step: every raw sample becomes a curve
//! anchor and the visual smoothing comes from the quadratic interpolation in
//! [`crate::curve`]. Coordinates are never averaged.

use crate::sampler::TimedPoint;

/// Multiplier applied to `distance / elapsed_ms` to get a speed estimate.
pub const SPEED_SCALE: f64 = 100.0;

/// Choose the curve anchors for the current stroke buffer.
///
/// Fewer than three points are returned as-is. Otherwise the output has the
/// same length, with the first and last samples passed through and the
/// interior samples kept as themselves.
pub fn control_points(points: &[TimedPoint]) -> Vec<TimedPoint> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut anchors = Vec::with_capacity(points.len());
    anchors.push(points[0]);
    anchors.extend_from_slice(&points[1..last]);
    anchors.push(points[last]);
    anchors
}

/// Estimate drawing speed from the first and most recent samples.
///
/// Distance from the first buffered point to the last, over the time between
/// them, scaled by [`SPEED_SCALE`]. This is a cheap proxy, not a derivative,
/// and it restarts whenever the buffer is cleared. Returns 0 with fewer than
/// two points or when no time has elapsed.
pub fn estimate_speed(points: &[TimedPoint]) -> f64 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return 0.0;
    };
    if points.len() < 2 {
        return 0.0;
    }

    let elapsed = last.time - first.time;
    if elapsed > 0.0 {
        last.distance(first) / elapsed * SPEED_SCALE
    } else {
        0.0
    }
}
