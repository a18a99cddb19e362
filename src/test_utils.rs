//! Test utilities for trajectory and prism tests.
//!
//! Provides trajectory fixtures and assertions for the probability-field
//! invariants (unit mass, zero mass outside the accessible region).

use chrono::{TimeZone, Utc};

use crate::grid::{GridWindow, Mask, Raster};
use crate::trajectory::{FixRecord, MemorySource, Trajectory};
use crate::types::{Point, SpatialReference, Timestamp, offset_seconds};

/// Fixtures for building test trajectories.
pub mod fixtures {
    use super::*;

    /// Fixed reference instant for every fixture.
    pub fn epoch() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    /// Record `oid` at (`x`, `y`), `seconds` after `t0`.
    pub fn record(oid: i64, x: f64, y: f64, t0: Timestamp, seconds: f64) -> FixRecord {
        FixRecord::new(oid, Point::new(x, y), offset_seconds(t0, seconds))
    }

    /// Point source with fixes `spacing` apart along the x-axis.
    pub fn straight_line_source(times: &[f64], spacing: f64) -> MemorySource {
        let t0 = epoch();
        let records = times
            .iter()
            .enumerate()
            .map(|(i, &t)| record(i as i64 + 1, i as f64 * spacing, 0.0, t0, t))
            .collect();
        MemorySource::new(records).with_spatial_reference(SpatialReference::Epsg(32617))
    }

    /// Trajectory with fixes `spacing` apart along the x-axis.
    pub fn straight_line(times: &[f64], spacing: f64) -> Trajectory {
        Trajectory::from_source(&straight_line_source(times, spacing))
            .expect("valid straight-line trajectory")
    }

    /// Trajectory with fixes `spacing` apart along both axes (45° heading).
    pub fn diagonal(times: &[f64], spacing: f64) -> Trajectory {
        let t0 = epoch();
        let records = times
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let d = i as f64 * spacing;
                record(i as i64 + 1, d, d, t0, t)
            })
            .collect();
        Trajectory::from_records(records, SpatialReference::Unknown)
            .expect("valid diagonal trajectory")
    }

    /// Two fixes: the origin at t = 0 and (`dx`, `dy`) at `elapsed` seconds.
    pub fn two_fix(dx: f64, dy: f64, elapsed: f64) -> Trajectory {
        let t0 = epoch();
        let records = vec![record(1, 0.0, 0.0, t0, 0.0), record(2, dx, dy, t0, elapsed)];
        Trajectory::from_records(records, SpatialReference::Unknown)
            .expect("valid two-fix trajectory")
    }

    /// Analysis window the assembler would use for `trajectory`.
    pub fn window_for(trajectory: &Trajectory, cell_size: f64, expand: f64) -> GridWindow {
        GridWindow::new(trajectory.extent().expand(expand), cell_size).expect("valid window")
    }
}

/// Assertions for probability-field invariants.
pub mod assertions {
    use super::*;

    /// Assert the finite cells of `field` sum to 1 within `tolerance`.
    ///
    /// # Panics
    /// Panics if the mass differs from 1 or any cell is negative.
    pub fn assert_unit_mass(field: &Raster, tolerance: f64) {
        let cells = field.cells();
        assert!(
            cells.iter().all(|&p| p.is_nan() || p >= 0.0),
            "probability field has negative cells"
        );
        let mass: f64 = cells.iter().filter(|p| p.is_finite()).sum();
        assert!(
            (mass - 1.0).abs() <= tolerance,
            "probability mass {mass:.12} differs from 1 by more than {tolerance:e}"
        );
    }

    /// Assert every cell outside `support` carries zero (or null) probability.
    pub fn assert_zero_outside(field: &Raster, support: &Mask) {
        for (idx, (&p, &inside)) in field.cells().iter().zip(support.cells()).enumerate() {
            if !inside {
                assert!(
                    p.is_nan() || p == 0.0,
                    "cell {idx} outside the accessible region has probability {p}"
                );
            }
        }
    }
}

/// Grid engines that stand in for an external raster backend.
pub mod engines {
    use super::*;
    use crate::grid::{CellOp, GridEngine, GridError};

    /// Engine whose every operation fails with [`GridError::Engine`].
    pub struct FailingEngine {
        pub reason: &'static str,
    }

    impl FailingEngine {
        fn fail<T>(&self) -> Result<T, GridError> {
            Err(GridError::Engine(self.reason.to_string()))
        }
    }

    impl GridEngine for FailingEngine {
        fn euclidean_distance_to_set(
            &self,
            _window: &GridWindow,
            _sources: &[Point],
        ) -> Result<Raster, GridError> {
            self.fail()
        }

        fn less_equal(&self, _raster: &Raster, _threshold: f64) -> Result<Mask, GridError> {
            self.fail()
        }

        fn and(&self, _a: &Mask, _b: &Mask) -> Result<Mask, GridError> {
            self.fail()
        }

        fn combine(&self, _op: CellOp, _a: &Raster, _b: &Raster) -> Result<Raster, GridError> {
            self.fail()
        }

        fn broadcast(&self, _op: CellOp, _raster: &Raster, _value: f64) -> Result<Raster, GridError> {
            self.fail()
        }

        fn reciprocal(&self, _raster: &Raster) -> Result<Raster, GridError> {
            self.fail()
        }

        fn retain(&self, _raster: &Raster, _mask: &Mask) -> Result<Raster, GridError> {
            self.fail()
        }

        fn fill_null(&self, _raster: &Raster, _value: f64) -> Result<Raster, GridError> {
            self.fail()
        }

        fn sum(&self, _raster: &Raster) -> Result<f64, GridError> {
            self.fail()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Raster;

    #[test]
    fn test_straight_line_fixture_spacing() {
        let traj = fixtures::straight_line(&[0.0, 60.0, 150.0], 300.0);
        let xs: Vec<f64> = traj.fixes().iter().map(|f| f.point.x).collect();
        assert_eq!(xs, vec![0.0, 300.0, 600.0]);
    }

    #[test]
    #[should_panic(expected = "probability mass")]
    fn test_unit_mass_detects_missing_mass() {
        let w = fixtures::window_for(&fixtures::straight_line(&[0.0, 10.0], 20.0), 10.0, 0.0);
        assertions::assert_unit_mass(&Raster::filled(w, 0.25), 1e-9);
    }
}
