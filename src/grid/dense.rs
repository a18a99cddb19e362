//! In-memory raster engine.
//!
//! Cell arithmetic runs four lanes at a time through `wide::f64x4`; the tail
//! that does not fill a lane falls back to scalar code. Results are normalized
//! so any non-finite value (division by zero, overflow) becomes null.

use wide::f64x4;

use super::{CellOp, GridEngine, GridError, GridWindow, Mask, Raster};
use crate::types::Point;

const LANES: usize = 4;

/// Stateless dense raster engine. Safe to share across threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenseEngine;

#[inline]
fn lane(chunk: &[f64]) -> f64x4 {
    f64x4::new([chunk[0], chunk[1], chunk[2], chunk[3]])
}

/// Combine two equal-length cell buffers lane-wise.
fn zip_cells(
    a: &[f64],
    b: &[f64],
    simd: impl Fn(f64x4, f64x4) -> f64x4,
    scalar: impl Fn(f64, f64) -> f64,
) -> Vec<f64> {
    let mut out = Vec::with_capacity(a.len());
    let mut ca = a.chunks_exact(LANES);
    let mut cb = b.chunks_exact(LANES);
    for (x, y) in (&mut ca).zip(&mut cb) {
        out.extend_from_slice(&simd(lane(x), lane(y)).to_array());
    }
    for (x, y) in ca.remainder().iter().zip(cb.remainder()) {
        out.push(scalar(*x, *y));
    }
    out
}

/// Apply a lane-wise map to one cell buffer.
fn map_cells(
    a: &[f64],
    simd: impl Fn(f64x4) -> f64x4,
    scalar: impl Fn(f64) -> f64,
) -> Vec<f64> {
    let mut out = Vec::with_capacity(a.len());
    let mut ca = a.chunks_exact(LANES);
    for x in &mut ca {
        out.extend_from_slice(&simd(lane(x)).to_array());
    }
    out.extend(ca.remainder().iter().map(|&x| scalar(x)));
    out
}

/// Non-finite results become null.
fn normalize_nulls(mut cells: Vec<f64>) -> Vec<f64> {
    for v in &mut cells {
        if !v.is_finite() {
            *v = f64::NAN;
        }
    }
    cells
}

fn same_window(a: &GridWindow, b: &GridWindow) -> Result<(), GridError> {
    if a == b {
        Ok(())
    } else {
        Err(GridError::WindowMismatch)
    }
}

fn apply_op(op: CellOp, a: &[f64], b: &[f64]) -> Vec<f64> {
    // NaN propagates through IEEE arithmetic, so the SIMD paths keep null semantics.
    let cells = match op {
        CellOp::Add => zip_cells(a, b, |x, y| x + y, |x, y| x + y),
        CellOp::Subtract => zip_cells(a, b, |x, y| x - y, |x, y| x - y),
        CellOp::Multiply => zip_cells(a, b, |x, y| x * y, |x, y| x * y),
        CellOp::Divide => zip_cells(a, b, |x, y| x / y, |x, y| x / y),
        CellOp::Max => a.iter().zip(b).map(|(&x, &y)| op.apply(x, y)).collect(),
    };
    normalize_nulls(cells)
}

impl GridEngine for DenseEngine {
    fn euclidean_distance_to_set(
        &self,
        window: &GridWindow,
        sources: &[Point],
    ) -> Result<Raster, GridError> {
        if sources.is_empty() {
            return Err(GridError::NoSources);
        }
        // Sources are rasterized: distances are measured between cell centers.
        let snapped = sources
            .iter()
            .map(|&p| {
                window
                    .cell_of(p)
                    .map(|(row, col)| window.cell_center(row, col))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cells = (0..window.cell_count())
            .map(|idx| {
                let center = window.center_of_index(idx);
                snapped
                    .iter()
                    .map(|s| s.distance(center))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        Raster::from_cells(*window, cells)
    }

    fn less_equal(&self, raster: &Raster, threshold: f64) -> Result<Mask, GridError> {
        let cells = raster.cells().iter().map(|&v| v <= threshold).collect();
        Mask::from_cells(*raster.window(), cells)
    }

    fn and(&self, a: &Mask, b: &Mask) -> Result<Mask, GridError> {
        same_window(a.window(), b.window())?;
        let cells = a
            .cells()
            .iter()
            .zip(b.cells())
            .map(|(&x, &y)| x && y)
            .collect();
        Mask::from_cells(*a.window(), cells)
    }

    fn combine(&self, op: CellOp, a: &Raster, b: &Raster) -> Result<Raster, GridError> {
        same_window(a.window(), b.window())?;
        Raster::from_cells(*a.window(), apply_op(op, a.cells(), b.cells()))
    }

    fn broadcast(&self, op: CellOp, raster: &Raster, value: f64) -> Result<Raster, GridError> {
        let cells = match op {
            CellOp::Max => raster.cells().iter().map(|&x| op.apply(x, value)).collect(),
            _ => {
                let rhs = vec![value; raster.cells().len()];
                apply_op(op, raster.cells(), &rhs)
            }
        };
        Raster::from_cells(*raster.window(), cells)
    }

    fn reciprocal(&self, raster: &Raster) -> Result<Raster, GridError> {
        let one = f64x4::splat(1.0);
        let cells = map_cells(raster.cells(), |x| one / x, |x| 1.0 / x);
        Raster::from_cells(*raster.window(), normalize_nulls(cells))
    }

    fn retain(&self, raster: &Raster, mask: &Mask) -> Result<Raster, GridError> {
        same_window(raster.window(), mask.window())?;
        let cells = raster
            .cells()
            .iter()
            .zip(mask.cells())
            .map(|(&v, &keep)| if keep { v } else { f64::NAN })
            .collect();
        Raster::from_cells(*raster.window(), cells)
    }

    fn fill_null(&self, raster: &Raster, value: f64) -> Result<Raster, GridError> {
        let cells = raster
            .cells()
            .iter()
            .map(|&v| if v.is_nan() { value } else { v })
            .collect();
        Raster::from_cells(*raster.window(), cells)
    }

    fn sum(&self, raster: &Raster) -> Result<f64, GridError> {
        Ok(raster.cells().iter().filter(|v| v.is_finite()).sum())
    }
}
