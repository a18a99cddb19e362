//! Common test utilities for integration tests.

use chrono::{TimeZone, Utc};
use stprism::trajectory::{FixRecord, MemorySource};
use stprism::types::{Point, SpatialReference, Timestamp, offset_seconds};

/// Reference instant shared by every scenario.
pub fn epoch() -> Timestamp {
    Utc.with_ymd_and_hms(2023, 9, 14, 6, 30, 0).unwrap()
}

/// Point source from `(x, y, seconds)` triples, oids assigned in input order.
pub fn source(fixes: &[(f64, f64, f64)]) -> MemorySource {
    let t0 = epoch();
    let records = fixes
        .iter()
        .enumerate()
        .map(|(i, &(x, y, t))| FixRecord::new(i as i64 + 1, Point::new(x, y), offset_seconds(t0, t)))
        .collect();
    MemorySource::new(records).with_spatial_reference(SpatialReference::Epsg(26917))
}

/// Sum of all finite cells.
pub fn mass(cells: &[f64]) -> f64 {
    cells.iter().filter(|v| v.is_finite()).sum()
}
