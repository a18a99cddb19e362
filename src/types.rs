//! Core value types shared across the crate: points, extents and time helpers.

use chrono::{DateTime, TimeDelta, Utc};
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A planar point in projected map units.
pub type Point = DVec2;

/// Timestamp type used for every fix and disk.
pub type Timestamp = DateTime<Utc>;

/// Microseconds per second, the resolution used for timestamp arithmetic.
const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Axis-aligned bounding box in projected map units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Smallest extent covering every point, or `None` for an empty set.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut extent = Self::new(first.x, first.y, first.x, first.y);
        for p in iter {
            extent.xmin = extent.xmin.min(p.x);
            extent.ymin = extent.ymin.min(p.y);
            extent.xmax = extent.xmax.max(p.x);
            extent.ymax = extent.ymax.max(p.y);
        }
        Some(extent)
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Grow the extent on all four sides by `factor` times its own width and height.
    ///
    /// A factor of 0.5 doubles both dimensions. Degenerate (zero-width or
    /// zero-height) extents stay degenerate along that axis.
    pub fn expand(&self, factor: f64) -> Self {
        let dx = self.width() * factor;
        let dy = self.height() * factor;
        Self {
            xmin: self.xmin - dx,
            ymin: self.ymin - dy,
            xmax: self.xmax + dx,
            ymax: self.ymax + dy,
        }
    }

    /// Whether `p` lies inside the extent, boundary included.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.xmin && p.x <= self.xmax && p.y >= self.ymin && p.y <= self.ymax
    }
}

/// Opaque spatial reference carried through from the point source.
///
/// The crate never interprets it; all geometry assumes a projected
/// coordinate system whose map units are shared by every input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpatialReference {
    #[default]
    Unknown,
    /// EPSG authority code, e.g. 32617 for UTM zone 17N.
    Epsg(u32),
    /// Well-known text definition.
    Wkt(String),
}

/// Seconds elapsed from `from` to `to` (negative when `to` is earlier).
pub fn seconds_between(from: Timestamp, to: Timestamp) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / MICROS_PER_SECOND,
        // Out of microsecond range (~292k years); millisecond precision is plenty there.
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}

/// Offset `base` by a fractional number of seconds, rounded to the microsecond.
pub fn offset_seconds(base: Timestamp, seconds: f64) -> Timestamp {
    base + TimeDelta::microseconds((seconds * MICROS_PER_SECOND).round() as i64)
}
