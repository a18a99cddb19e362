//! Disk geometry for a single segment.
//!
//! A segment of elapsed time `T` is cut into `K = round(T / dt)` slices. For
//! slice `k` the object, moving at most `s * m`, must be within
//! `r_i = t * s * m` of the origin and within `r_j = (T - t) * s * m` of the
//! destination, where `t = (k + 1) * dt`. The intersection of those two
//! distance cones is the disk's accessible region.
//!
//! The probabilistic disk weights that region by inverse distance to a
//! center placed on the origin-destination line at `k * dt / (T - dt)`. The
//! center trails the radius bound by one slice: it marks the start of the
//! interval, while the radii use its end.

use tracing::trace;

use super::{Disk, DiskField, PrismMode};
use crate::geometry::point_along;
use crate::grid::{CellOp, GridEngine, GridError, GridWindow, Mask, Raster};
use crate::trajectory::Segment;
use crate::types::{Point, Timestamp, offset_seconds};

/// Number of disks for a segment of `elapsed_time` seconds.
///
/// Halfway cases round to even, so 2.5 slices give 2 disks and 3.5 give 4.
#[inline]
pub fn disk_count(elapsed_time: f64, disk_interval: f64) -> usize {
    let k = (elapsed_time / disk_interval).round_ties_even();
    if k.is_finite() && k > 0.0 { k as usize } else { 0 }
}

/// Forward radius from the origin and backward radius from the destination
/// for disk `k`.
///
/// # Arguments
/// * `k` - Disk index within the segment
/// * `disk_interval` - Seconds per disk
/// * `elapsed_time` - Segment duration in seconds
/// * `velocity` - Observed segment speed (map units per second)
/// * `velocity_multiplier` - Inflation applied to `velocity`
///
/// # Returns
/// `(r_i, r_j)` in map units. `r_j` reaches 0 on the last disk when
/// `elapsed_time` is a whole multiple of `disk_interval`.
#[inline]
pub fn accessible_radii(
    k: usize,
    disk_interval: f64,
    elapsed_time: f64,
    velocity: f64,
    velocity_multiplier: f64,
) -> (f64, f64) {
    let t = (k + 1) as f64 * disk_interval;
    let max_speed = velocity * velocity_multiplier;
    (t * max_speed, (elapsed_time - t) * max_speed)
}

/// IDW anchor for disk `k`.
///
/// When `elapsed_time == disk_interval` the progress denominator is zero and
/// the center stays at the origin.
#[inline]
pub fn disk_center(
    origin: Point,
    destination: Point,
    k: usize,
    disk_interval: f64,
    elapsed_time: f64,
) -> Point {
    let t = k as f64 * disk_interval;
    let denominator = elapsed_time - disk_interval;
    let fraction = if denominator > 0.0 { t / denominator } else { 0.0 };
    point_along(origin, destination, fraction)
}

/// Per-segment disk generator.
///
/// Holds the two distance surfaces shared by every disk of the segment, so
/// each disk is an independent computation over read-only state.
pub struct SegmentPrism<'a, E: GridEngine + ?Sized> {
    engine: &'a E,
    window: GridWindow,
    segment_index: usize,
    origin: Point,
    destination: Point,
    origin_time: Timestamp,
    velocity: f64,
    elapsed_time: f64,
    disk_interval: f64,
    velocity_multiplier: f64,
    from_origin: Raster,
    from_destination: Raster,
}

impl<'a, E: GridEngine + ?Sized> SegmentPrism<'a, E> {
    pub fn new(
        engine: &'a E,
        window: GridWindow,
        segment: &Segment<'_>,
        disk_interval: f64,
        velocity_multiplier: f64,
    ) -> Result<Self, GridError> {
        let origin = segment.origin.point;
        let destination = segment.destination.point;
        let from_origin = engine.euclidean_distance(&window, origin)?;
        let from_destination = engine.euclidean_distance(&window, destination)?;
        Ok(Self {
            engine,
            window,
            segment_index: segment.index,
            origin,
            destination,
            origin_time: segment.origin.timestamp,
            velocity: segment.velocity(),
            elapsed_time: segment.elapsed_time(),
            disk_interval,
            velocity_multiplier,
            from_origin,
            from_destination,
        })
    }

    pub fn disk_count(&self) -> usize {
        disk_count(self.elapsed_time, self.disk_interval)
    }

    pub fn radii(&self, k: usize) -> (f64, f64) {
        accessible_radii(
            k,
            self.disk_interval,
            self.elapsed_time,
            self.velocity,
            self.velocity_multiplier,
        )
    }

    pub fn center(&self, k: usize) -> Point {
        disk_center(
            self.origin,
            self.destination,
            k,
            self.disk_interval,
            self.elapsed_time,
        )
    }

    /// Start instant of the slice represented by disk `k`.
    pub fn z_min(&self, k: usize) -> Timestamp {
        offset_seconds(self.origin_time, k as f64 * self.disk_interval)
    }

    /// Accessible region of disk `k`: inside both distance cones.
    pub fn accessible_region(&self, k: usize) -> Result<Mask, GridError> {
        let (r_i, r_j) = self.radii(k);
        let origin_cone = self.engine.less_equal(&self.from_origin, r_i)?;
        let destination_cone = self.engine.less_equal(&self.from_destination, r_j)?;
        self.engine.and(&origin_cone, &destination_cone)
    }

    /// Classical (binary) disk `k`. Always emitted, even when empty.
    pub fn classical_disk(&self, k: usize) -> Result<Disk, GridError> {
        Ok(Disk {
            segment: self.segment_index,
            index: k,
            z_min: self.z_min(k),
            field: DiskField::Accessibility(self.accessible_region(k)?),
        })
    }

    /// Probabilistic disk `k`, or `None` when the disk carries no mass.
    ///
    /// Weights are `1 / max(d, cell_size)` so the cell holding the center gets
    /// the largest finite weight. Cells outside the accessible region are 0
    /// and the field sums to 1.
    pub fn probabilistic_disk(&self, k: usize) -> Result<Option<Disk>, GridError> {
        let support = self.accessible_region(k)?;
        if support.is_empty() {
            trace!(
                segment = self.segment_index,
                disk = k,
                "skipping disk: empty accessible region"
            );
            return Ok(None);
        }

        let center = self.center(k);
        let engine = self.engine;
        let distances = engine.euclidean_distance(&self.window, center)?;
        let clamped = engine.broadcast(CellOp::Max, &distances, self.window.cell_size())?;
        let weights = engine.retain(&engine.reciprocal(&clamped)?, &support)?;

        let total = engine.sum(&weights)?;
        if !(total.is_finite() && total > 0.0) {
            trace!(
                segment = self.segment_index,
                disk = k,
                total,
                "skipping disk: no finite weight"
            );
            return Ok(None);
        }

        let probability = engine.broadcast(CellOp::Divide, &weights, total)?;
        Ok(Some(Disk {
            segment: self.segment_index,
            index: k,
            z_min: self.z_min(k),
            field: DiskField::Probability(engine.fill_null(&probability, 0.0)?),
        }))
    }

    /// Disk `k` in the requested mode.
    pub fn disk(&self, k: usize, mode: PrismMode) -> Result<Option<Disk>, GridError> {
        match mode {
            PrismMode::Classical => self.classical_disk(k).map(Some),
            PrismMode::Probabilistic => self.probabilistic_disk(k),
        }
    }
}
