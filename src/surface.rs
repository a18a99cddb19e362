//! Comprehensive probability surface: noisy-OR compositing of disk fields.
//!
//! Two presence probabilities combine as `a + b - a * b`, which is
//! commutative, associative and has 0 as identity. Null cells count as 0.

use crate::grid::{CellOp, GridEngine, GridError, Raster};
use crate::prism::Disk;

#[derive(thiserror::Error, Debug)]
pub enum SurfaceError {
    #[error("compositing needs at least 2 fields, got {count}")]
    TooFewFields { count: usize },

    #[error("disk {index} carries an accessibility mask, not a probability field")]
    NotProbabilistic { index: usize },

    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Noisy-OR of two probability fields.
pub fn disk_or<E: GridEngine + ?Sized>(
    engine: &E,
    first: &Raster,
    second: &Raster,
) -> Result<Raster, GridError> {
    let a = engine.fill_null(first, 0.0)?;
    let b = engine.fill_null(second, 0.0)?;
    let sum = engine.combine(CellOp::Add, &a, &b)?;
    let product = engine.combine(CellOp::Multiply, &a, &b)?;
    engine.combine(CellOp::Subtract, &sum, &product)
}

/// Fold `fields` left to right with [`disk_or`].
///
/// # Errors
/// [`SurfaceError::TooFewFields`] when fewer than two fields are given.
pub fn composite<E: GridEngine + ?Sized>(
    engine: &E,
    fields: &[Raster],
) -> Result<Raster, SurfaceError> {
    let (first, rest) = match fields {
        [first, rest @ ..] if !rest.is_empty() => (first, rest),
        _ => {
            return Err(SurfaceError::TooFewFields {
                count: fields.len(),
            });
        }
    };
    let mut surface = disk_or(engine, first, &rest[0])?;
    for field in &rest[1..] {
        surface = disk_or(engine, &surface, field)?;
    }
    Ok(surface)
}

/// Composite the probability fields of a probabilistic disk stack.
pub fn comprehensive_probability_surface<E: GridEngine + ?Sized>(
    engine: &E,
    disks: &[Disk],
) -> Result<Raster, SurfaceError> {
    let fields = disks
        .iter()
        .enumerate()
        .map(|(index, disk)| {
            disk.probability()
                .cloned()
                .ok_or(SurfaceError::NotProbabilistic { index })
        })
        .collect::<Result<Vec<_>, _>>()?;
    composite(engine, &fields)
}
