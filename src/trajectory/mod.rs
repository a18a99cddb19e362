//! Trajectory model: timestamped fixes with per-segment kinematics.
//!
//! A [`Trajectory`] is built once from a [`PointSource`] and is immutable
//! afterwards. Fixes are sorted by timestamp (stable, so ties keep their
//! insertion order) and every fix except the last carries the distance,
//! elapsed time and velocity to its successor. The terminal fix has all
//! three set to zero.
//!
//! All distances are in the map units of the source's projected coordinate
//! system and all times are in seconds.

#[cfg(test)]
mod proptest_trajectory;

use std::convert::Infallible;
use std::error::Error as StdError;

use tracing::{debug, warn};

use crate::geometry::ZERO_LENGTH_EPSILON;
use crate::types::{Extent, Point, SpatialReference, Timestamp, seconds_between};

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum TrajectoryError {
    #[error("trajectory needs at least 2 fixes to form a segment, got {count}")]
    TooFewFixes { count: usize },

    #[error("fix {oid} has a non-finite location")]
    InvalidPoint { oid: i64 },

    #[error(
        "elapsed time from fix {from_oid} to fix {to_oid} is {elapsed} s (must be positive)"
    )]
    NonPositiveElapsed {
        from_oid: i64,
        to_oid: i64,
        elapsed: f64,
    },

    #[error("trajectory has no positive interval between fixes")]
    NoPositiveInterval,

    #[error("point source failed: {0}")]
    Source(#[source] BoxError),

    #[error("trajectory sink failed: {0}")]
    Sink(#[source] BoxError),
}

/// One raw observation as delivered by a point source.
#[derive(Clone, Debug, PartialEq)]
pub struct FixRecord {
    /// Unique identifier of the observation.
    pub oid: i64,
    pub point: Point,
    pub timestamp: Timestamp,
}

impl FixRecord {
    pub fn new(oid: i64, point: Point, timestamp: Timestamp) -> Self {
        Self {
            oid,
            point,
            timestamp,
        }
    }
}

/// A fix with the kinematics of the segment that starts at it.
#[derive(Clone, Debug, PartialEq)]
pub struct Fix {
    pub oid: i64,
    pub point: Point,
    pub timestamp: Timestamp,
    /// Distance to the next fix (map units); 0 for the last fix.
    pub distance: f64,
    /// Seconds until the next fix; 0 for the last fix.
    pub elapsed_time: f64,
    /// `distance / elapsed_time`; 0 for the last fix.
    pub velocity: f64,
}

/// Consecutive pair of fixes.
#[derive(Clone, Copy, Debug)]
pub struct Segment<'a> {
    /// Position of the origin fix in the trajectory.
    pub index: usize,
    pub origin: &'a Fix,
    pub destination: &'a Fix,
}

impl Segment<'_> {
    pub fn elapsed_time(&self) -> f64 {
        self.origin.elapsed_time
    }

    pub fn velocity(&self) -> f64 {
        self.origin.velocity
    }

    pub fn distance(&self) -> f64 {
        self.origin.distance
    }
}

/// Supplier of raw fixes for one moving object.
pub trait PointSource {
    type Error: StdError + Send + Sync + 'static;

    /// All observations, in any order.
    fn records(&self) -> Result<Vec<FixRecord>, Self::Error>;

    /// Spatial reference of the point geometries.
    fn spatial_reference(&self) -> SpatialReference;

    /// Bounding extent of the full point set, if the source tracks one.
    ///
    /// When `None` the trajectory derives it from the fixes.
    fn extent(&self) -> Option<Extent> {
        None
    }
}

/// Point source backed by a vector of records.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    pub records: Vec<FixRecord>,
    pub spatial_reference: SpatialReference,
}

impl MemorySource {
    pub fn new(records: Vec<FixRecord>) -> Self {
        Self {
            records,
            spatial_reference: SpatialReference::Unknown,
        }
    }

    pub fn with_spatial_reference(mut self, spatial_reference: SpatialReference) -> Self {
        self.spatial_reference = spatial_reference;
        self
    }
}

impl PointSource for MemorySource {
    type Error = Infallible;

    fn records(&self) -> Result<Vec<FixRecord>, Self::Error> {
        Ok(self.records.clone())
    }

    fn spatial_reference(&self) -> SpatialReference {
        self.spatial_reference.clone()
    }
}

/// One exported fix row.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportRow {
    pub oid: i64,
    pub point: Point,
    pub timestamp: Timestamp,
    pub distance: f64,
    pub elapsed_time: f64,
    pub velocity: f64,
}

impl From<&Fix> for ExportRow {
    fn from(fix: &Fix) -> Self {
        Self {
            oid: fix.oid,
            point: fix.point,
            timestamp: fix.timestamp,
            distance: fix.distance,
            elapsed_time: fix.elapsed_time,
            velocity: fix.velocity,
        }
    }
}

/// Destination for [`Trajectory::export`], e.g. a feature-class writer.
pub trait TrajectorySink {
    type Error: StdError + Send + Sync + 'static;

    /// Prepare the output for rows in the given spatial reference.
    fn begin(&mut self, _spatial_reference: &SpatialReference) -> Result<(), Self::Error> {
        Ok(())
    }

    fn write_row(&mut self, row: ExportRow) -> Result<(), Self::Error>;

    fn finish(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl TrajectorySink for Vec<ExportRow> {
    type Error = Infallible;

    fn write_row(&mut self, row: ExportRow) -> Result<(), Self::Error> {
        self.push(row);
        Ok(())
    }
}

/// Ordered fixes of one moving object with derived kinematics.
#[derive(Clone, Debug)]
pub struct Trajectory {
    fixes: Vec<Fix>,
    extent: Extent,
    spatial_reference: SpatialReference,
    duration: f64,
    minimum_disk_interval: f64,
}

impl Trajectory {
    /// Read every record from `source` and build the trajectory.
    pub fn from_source<S: PointSource>(source: &S) -> Result<Self, TrajectoryError> {
        let records = source
            .records()
            .map_err(|e| TrajectoryError::Source(Box::new(e)))?;
        let mut trajectory = Self::from_records(records, source.spatial_reference())?;
        if let Some(extent) = source.extent() {
            trajectory.extent = extent;
        }
        Ok(trajectory)
    }

    /// Build from raw records in any order.
    ///
    /// # Errors
    /// - [`TrajectoryError::TooFewFixes`] with fewer than 2 records
    /// - [`TrajectoryError::InvalidPoint`] for a NaN or infinite coordinate
    /// - [`TrajectoryError::NonPositiveElapsed`] when two consecutive fixes
    ///   share a timestamp
    pub fn from_records(
        mut records: Vec<FixRecord>,
        spatial_reference: SpatialReference,
    ) -> Result<Self, TrajectoryError> {
        if records.len() < 2 {
            return Err(TrajectoryError::TooFewFixes {
                count: records.len(),
            });
        }
        if let Some(bad) = records.iter().find(|r| !r.point.is_finite()) {
            return Err(TrajectoryError::InvalidPoint { oid: bad.oid });
        }

        // Stable: equal timestamps keep insertion order.
        records.sort_by_key(|r| r.timestamp);

        let mut fixes = Vec::with_capacity(records.len());
        for pair in records.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let elapsed_time = seconds_between(current.timestamp, next.timestamp);
            if !(elapsed_time > 0.0) {
                return Err(TrajectoryError::NonPositiveElapsed {
                    from_oid: current.oid,
                    to_oid: next.oid,
                    elapsed: elapsed_time,
                });
            }
            let distance = current.point.distance(next.point);
            if distance <= ZERO_LENGTH_EPSILON {
                warn!(
                    from_oid = current.oid,
                    to_oid = next.oid,
                    "stationary segment: fixes share a location"
                );
            }
            fixes.push(Fix {
                oid: current.oid,
                point: current.point,
                timestamp: current.timestamp,
                distance,
                elapsed_time,
                velocity: distance / elapsed_time,
            });
        }

        let last = &records[records.len() - 1];
        fixes.push(Fix {
            oid: last.oid,
            point: last.point,
            timestamp: last.timestamp,
            distance: 0.0,
            elapsed_time: 0.0,
            velocity: 0.0,
        });

        let minimum_disk_interval = fixes
            .iter()
            .map(|f| f.elapsed_time)
            .filter(|&e| e > 0.0)
            .reduce(f64::min)
            .ok_or(TrajectoryError::NoPositiveInterval)?;

        let duration = seconds_between(fixes[0].timestamp, last.timestamp);
        let extent = Extent::from_points(fixes.iter().map(|f| &f.point))
            .ok_or(TrajectoryError::TooFewFixes { count: 0 })?;

        debug!(
            count = fixes.len(),
            duration,
            minimum_disk_interval,
            "trajectory built"
        );

        Ok(Self {
            fixes,
            extent,
            spatial_reference,
            duration,
            minimum_disk_interval,
        })
    }

    /// Fixes in chronological order.
    pub fn fixes(&self) -> &[Fix] {
        &self.fixes
    }

    /// Segments in chronological order (one per fix except the last).
    pub fn segments(&self) -> impl ExactSizeIterator<Item = Segment<'_>> + '_ {
        self.fixes
            .windows(2)
            .enumerate()
            .map(|(index, pair)| Segment {
                index,
                origin: &pair[0],
                destination: &pair[1],
            })
    }

    pub fn segment(&self, index: usize) -> Option<Segment<'_>> {
        let destination = self.fixes.get(index + 1)?;
        Some(Segment {
            index,
            origin: &self.fixes[index],
            destination,
        })
    }

    pub fn count(&self) -> usize {
        self.fixes.len()
    }

    /// Seconds from the first to the last fix.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Bounding extent of all fixes.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn spatial_reference(&self) -> &SpatialReference {
        &self.spatial_reference
    }

    /// Smallest positive elapsed time between consecutive fixes.
    pub fn minimum_disk_interval(&self) -> f64 {
        self.minimum_disk_interval
    }

    /// Write every fix, in order, to `sink`.
    pub fn export<K: TrajectorySink>(&self, sink: &mut K) -> Result<(), TrajectoryError> {
        let sink_err = |e: K::Error| TrajectoryError::Sink(Box::new(e));
        sink.begin(&self.spatial_reference).map_err(sink_err)?;
        for fix in &self.fixes {
            sink.write_row(ExportRow::from(fix)).map_err(sink_err)?;
        }
        sink.finish().map_err(sink_err)
    }
}
