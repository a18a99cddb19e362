//! stprism - Space-Time Prisms from Trajectories
//!
//! Computes where a moving object could have been between two timestamped
//! fixes, given a maximum travel speed:
//! - classical voxel prisms (binary potential path area per time slice)
//! - probabilistic prisms (inverse-distance likelihood per time slice)
//! - a comprehensive probability surface compositing a prism's slices
//!
//! Raster work is delegated to a [`grid::GridEngine`]; [`grid::DenseEngine`]
//! is the built-in in-memory implementation.

pub mod geometry;
pub mod grid;
pub mod prism;
pub mod surface;
pub mod trajectory;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use grid::{DenseEngine, GridEngine, GridWindow, Mask, Raster};
pub use prism::{Disk, DiskField, PrismConfig, PrismError, PrismMode, generate};
pub use surface::{comprehensive_probability_surface, composite, disk_or};
pub use trajectory::{FixRecord, PointSource, Trajectory};
