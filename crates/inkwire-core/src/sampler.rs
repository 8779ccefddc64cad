//! Pointer sampling for the stroke in progress.

use kurbo::Point;
use serde::{Deserialize, Serialize};

// Use web-time on WASM, std::time otherwise
#[cfg(target_arch = "wasm32")]
use web_time::{SystemTime, UNIX_EPOCH};
#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time in milliseconds, the unit carried by [`TimedPoint::time`].
pub fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// A pointer position and the time it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedPoint {
    pub x: f64,
    pub y: f64,
    /// Milliseconds. Some front ends send this as `t`.
    #[serde(alias = "t")]
    pub time: f64,
}

impl TimedPoint {
    pub fn new(x: f64, y: f64, time: f64) -> Self {
        Self { x, y, time }
    }

    /// Sample a position at the current wall-clock time.
    pub fn now(x: f64, y: f64) -> Self {
        Self::new(x, y, now_millis())
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Straight-line distance to another point.
    pub fn distance(&self, other: &TimedPoint) -> f64 {
        self.position().distance(other.position())
    }
}

/// Points of a single stroke, from press to release.
///
/// Only the [`PointSampler`] appends to it; it is emptied in one step when
/// the stroke ends.
#[derive(Debug, Clone, Default)]
pub struct StrokeBuffer {
    points: Vec<TimedPoint>,
}

impl StrokeBuffer {
    pub fn points(&self) -> &[TimedPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&TimedPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TimedPoint> {
        self.points.last()
    }

    fn push(&mut self, point: TimedPoint) {
        self.points.push(point);
    }

    fn clear(&mut self) {
        self.points.clear();
    }
}

/// Collects pointer samples while a stroke is active.
#[derive(Debug, Clone, Default)]
pub struct PointSampler {
    buffer: StrokeBuffer,
    active: bool,
}

impl PointSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a stroke at `point` (pointer down).
    pub fn begin(&mut self, point: TimedPoint) {
        self.buffer.clear();
        self.buffer.push(point);
        self.active = true;
    }

    /// Record a pointer move. Returns false when no stroke is active.
    pub fn sample(&mut self, point: TimedPoint) -> bool {
        if !self.active {
            return false;
        }
        self.buffer.push(point);
        true
    }

    /// End the stroke (pointer up or pointer leaving the canvas).
    pub fn end(&mut self) {
        self.active = false;
        self.buffer.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn buffer(&self) -> &StrokeBuffer {
        &self.buffer
    }
}
