//! Straight-line interpolation between two anchors.

use crate::types::Point;

/// Lines shorter than this (map units) are treated as zero-length.
pub const ZERO_LENGTH_EPSILON: f64 = 1e-12;

/// Point at proportional position `fraction` along the line from `from` to `to`.
///
/// `fraction` is clamped to `[0, 1]`, so positions past either end snap to
/// that end point. A zero-length line (identical endpoints) returns `from`.
/// A non-finite fraction is treated as 0.
#[inline]
pub fn point_along(from: Point, to: Point, fraction: f64) -> Point {
    let delta = to - from;
    if delta.length_squared() <= ZERO_LENGTH_EPSILON * ZERO_LENGTH_EPSILON {
        return from;
    }
    let f = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    // Rounding in `from + delta * f` may overshoot an endpoint by an ulp.
    (from + delta * f).clamp(from.min(to), from.max(to))
}
