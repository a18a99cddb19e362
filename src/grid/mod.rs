//! Raster grid abstraction used by the prism algorithms.
//!
//! The prism core never touches cells directly. Every per-cell operation goes
//! through a [`GridEngine`], so hosts can plug in their own raster backend.
//! [`dense::DenseEngine`] is the in-memory reference engine.
//!
//! Conventions:
//! - Grids are north-up and row-major; row 0 touches `extent.ymax`.
//! - A null (undefined) cell is stored as `NaN`.
//! - The analysis window is always an explicit argument; there is no ambient
//!   "current extent".

pub mod dense;

pub use dense::DenseEngine;

use crate::types::{Extent, Point};

/// Upper bound on cells per window, to catch runaway extents before allocating.
pub const MAX_CELLS: usize = 1 << 28;

#[derive(thiserror::Error, Debug)]
pub enum GridError {
    #[error("invalid cell size: {0} (must be positive and finite)")]
    InvalidCellSize(f64),

    #[error("invalid analysis extent {0:?}")]
    InvalidExtent(Extent),

    #[error("analysis window of {cols}x{rows} cells exceeds the {max} cell limit")]
    TooLarge { cols: usize, rows: usize, max: usize },

    #[error("operands are defined on different analysis windows")]
    WindowMismatch,

    #[error("cell buffer has {got} values, window expects {expected}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("point ({x}, {y}) lies outside the analysis window")]
    OutsideWindow { x: f64, y: f64 },

    #[error("distance transform needs at least one source point")]
    NoSources,

    #[error("grid engine failure: {0}")]
    Engine(String),
}

/// Analysis extent plus cell size: the frame every raster is defined on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridWindow {
    extent: Extent,
    cell_size: f64,
    cols: usize,
    rows: usize,
}

impl GridWindow {
    /// Build a window covering `extent` with square cells of `cell_size`.
    ///
    /// Column and row counts are rounded up so the grid covers the whole
    /// extent; a degenerate axis still gets one cell.
    pub fn new(extent: Extent, cell_size: f64) -> Result<Self, GridError> {
        if !(cell_size > 0.0 && cell_size.is_finite()) {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        let finite = [extent.xmin, extent.ymin, extent.xmax, extent.ymax]
            .iter()
            .all(|v| v.is_finite());
        if !finite || extent.width() < 0.0 || extent.height() < 0.0 {
            return Err(GridError::InvalidExtent(extent));
        }

        let cols = ((extent.width() / cell_size).ceil() as usize).max(1);
        let rows = ((extent.height() / cell_size).ceil() as usize).max(1);
        if cols.saturating_mul(rows) > MAX_CELLS {
            return Err(GridError::TooLarge {
                cols,
                rows,
                max: MAX_CELLS,
            });
        }

        Ok(Self {
            extent,
            cell_size,
            cols,
            rows,
        })
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_count(&self) -> usize {
        self.cols * self.rows
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Center of the cell at (`row`, `col`).
    #[inline]
    pub fn cell_center(&self, row: usize, col: usize) -> Point {
        Point::new(
            self.extent.xmin + (col as f64 + 0.5) * self.cell_size,
            self.extent.ymax - (row as f64 + 0.5) * self.cell_size,
        )
    }

    /// Center of the cell at flat index `idx`.
    #[inline]
    pub fn center_of_index(&self, idx: usize) -> Point {
        self.cell_center(idx / self.cols, idx % self.cols)
    }

    /// (row, col) of the cell containing `p`.
    ///
    /// Points on the far (east/south) edge belong to the last column/row.
    pub fn cell_of(&self, p: Point) -> Result<(usize, usize), GridError> {
        if !p.is_finite() || !self.extent.contains(p) {
            return Err(GridError::OutsideWindow { x: p.x, y: p.y });
        }
        let col = ((p.x - self.extent.xmin) / self.cell_size).floor() as usize;
        let row = ((self.extent.ymax - p.y) / self.cell_size).floor() as usize;
        Ok((row.min(self.rows - 1), col.min(self.cols - 1)))
    }
}

/// Real-valued raster. Null cells are `NaN`.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    window: GridWindow,
    cells: Vec<f64>,
}

impl Raster {
    /// Raster with every cell set to `value`.
    pub fn filled(window: GridWindow, value: f64) -> Self {
        Self {
            window,
            cells: vec![value; window.cell_count()],
        }
    }

    /// Wrap a row-major cell buffer.
    pub fn from_cells(window: GridWindow, cells: Vec<f64>) -> Result<Self, GridError> {
        if cells.len() != window.cell_count() {
            return Err(GridError::ShapeMismatch {
                expected: window.cell_count(),
                got: cells.len(),
            });
        }
        Ok(Self { window, cells })
    }

    /// Build from a dense 2-D array (outer index = row).
    pub fn from_rows(window: GridWindow, rows: &[Vec<f64>]) -> Result<Self, GridError> {
        if rows.len() != window.rows() {
            return Err(GridError::ShapeMismatch {
                expected: window.cell_count(),
                got: rows.iter().map(Vec::len).sum(),
            });
        }
        let mut cells = Vec::with_capacity(window.cell_count());
        for row in rows {
            if row.len() != window.cols() {
                return Err(GridError::ShapeMismatch {
                    expected: window.cell_count(),
                    got: rows.iter().map(Vec::len).sum(),
                });
            }
            cells.extend_from_slice(row);
        }
        Ok(Self { window, cells })
    }

    /// Dense 2-D copy (outer index = row), nulls kept as `NaN`.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.cells
            .chunks(self.window.cols())
            .map(<[f64]>::to_vec)
            .collect()
    }

    pub fn window(&self) -> &GridWindow {
        &self.window
    }

    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    /// Value at (`row`, `col`); `None` when out of bounds or null.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.window.rows() || col >= self.window.cols() {
            return None;
        }
        let v = self.cells[self.window.index(row, col)];
        (!v.is_nan()).then_some(v)
    }

    /// Number of non-null cells.
    pub fn defined_count(&self) -> usize {
        self.cells.iter().filter(|v| !v.is_nan()).count()
    }
}

/// Boolean raster, e.g. an accessibility region.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    window: GridWindow,
    cells: Vec<bool>,
}

impl Mask {
    pub fn from_cells(window: GridWindow, cells: Vec<bool>) -> Result<Self, GridError> {
        if cells.len() != window.cell_count() {
            return Err(GridError::ShapeMismatch {
                expected: window.cell_count(),
                got: cells.len(),
            });
        }
        Ok(Self { window, cells })
    }

    pub fn window(&self) -> &GridWindow {
        &self.window
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> Option<bool> {
        if row >= self.window.rows() || col >= self.window.cols() {
            return None;
        }
        Some(self.cells[self.window.index(row, col)])
    }

    /// Number of `true` cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// True when no cell is set.
    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|&c| c)
    }
}

/// Binary per-cell operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Max,
}

impl CellOp {
    /// Apply to a single pair of cell values with null propagation.
    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        if a.is_nan() || b.is_nan() {
            return f64::NAN;
        }
        let v = match self {
            CellOp::Add => a + b,
            CellOp::Subtract => a - b,
            CellOp::Multiply => a * b,
            CellOp::Divide => a / b,
            CellOp::Max => a.max(b),
        };
        if v.is_finite() { v } else { f64::NAN }
    }
}

/// Raster computation service consumed by the prism core.
///
/// Implementations must be callable from several threads at once when the
/// prism is generated with [`crate::prism::Execution::Parallel`]. Any error
/// returned here is propagated to the caller unchanged.
pub trait GridEngine: Send + Sync {
    /// Euclidean distance from every cell center to the nearest source.
    fn euclidean_distance_to_set(
        &self,
        window: &GridWindow,
        sources: &[Point],
    ) -> Result<Raster, GridError>;

    /// Euclidean distance from every cell center to `source`.
    fn euclidean_distance(&self, window: &GridWindow, source: Point) -> Result<Raster, GridError> {
        self.euclidean_distance_to_set(window, std::slice::from_ref(&source))
    }

    /// Cells whose value is `<= threshold`. Null cells are never selected.
    fn less_equal(&self, raster: &Raster, threshold: f64) -> Result<Mask, GridError>;

    /// Per-cell boolean AND.
    fn and(&self, a: &Mask, b: &Mask) -> Result<Mask, GridError>;

    /// Per-cell `a op b`.
    fn combine(&self, op: CellOp, a: &Raster, b: &Raster) -> Result<Raster, GridError>;

    /// Per-cell `raster op value` (scalar broadcast).
    fn broadcast(&self, op: CellOp, raster: &Raster, value: f64) -> Result<Raster, GridError>;

    /// Per-cell `1 / raster`; division by zero yields null.
    fn reciprocal(&self, raster: &Raster) -> Result<Raster, GridError>;

    /// Keep cells where `mask` is set, null elsewhere.
    fn retain(&self, raster: &Raster, mask: &Mask) -> Result<Raster, GridError>;

    /// Replace null cells with `value`.
    fn fill_null(&self, raster: &Raster, value: f64) -> Result<Raster, GridError>;

    /// Sum of all finite cells (0 for an all-null raster).
    fn sum(&self, raster: &Raster) -> Result<f64, GridError>;
}
