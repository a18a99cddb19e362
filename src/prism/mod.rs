//! Space-time prism assembly.
//!
//! [`generate`] turns a [`Trajectory`] into a time-ordered stack of [`Disk`]s,
//! either classical (binary potential path area) or probabilistic (IDW mass
//! per disk). Every disk is an independent unit of work keyed by
//! [`DiskTask`]; the assembler may compute them in any order and restores
//! chronological order before returning.

mod config;
pub mod disk;

#[cfg(test)]
mod proptest_prism;

use std::fmt;

use rayon::prelude::*;
use tracing::{debug, info};

pub use config::{Execution, PrismConfig};
pub use disk::{SegmentPrism, accessible_radii, disk_center, disk_count};

use crate::grid::{GridEngine, GridError, GridWindow, Mask, Raster};
use crate::trajectory::{PointSource, Segment, Trajectory, TrajectoryError};
use crate::types::Timestamp;

#[derive(thiserror::Error, Debug)]
pub enum PrismError {
    #[error("disk interval {disk_interval} s exceeds shortest trajectory interval of {minimum} s")]
    DiskIntervalTooLarge { disk_interval: f64, minimum: f64 },

    #[error("invalid prism configuration: {0}")]
    InvalidConfig(String),

    #[error("segment {0} does not exist")]
    NoSuchSegment(usize),

    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Prism variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrismMode {
    /// Binary accessibility per disk (potential path area).
    Classical,
    /// Normalized inverse-distance probability per disk.
    Probabilistic,
}

impl fmt::Display for PrismMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrismMode::Classical => write!(f, "classical"),
            PrismMode::Probabilistic => write!(f, "probabilistic"),
        }
    }
}

/// Field carried by a disk.
#[derive(Clone, Debug, PartialEq)]
pub enum DiskField {
    Accessibility(Mask),
    Probability(Raster),
}

/// One time slice of a prism.
#[derive(Clone, Debug, PartialEq)]
pub struct Disk {
    /// Segment (origin fix position) the disk belongs to.
    pub segment: usize,
    /// Disk position within its segment.
    pub index: usize,
    /// Start instant of the slice; the minimum z value of its voxels.
    pub z_min: Timestamp,
    pub field: DiskField,
}

impl Disk {
    pub fn task(&self) -> DiskTask {
        DiskTask {
            segment: self.segment,
            index: self.index,
        }
    }

    pub fn accessibility(&self) -> Option<&Mask> {
        match &self.field {
            DiskField::Accessibility(mask) => Some(mask),
            DiskField::Probability(_) => None,
        }
    }

    pub fn probability(&self) -> Option<&Raster> {
        match &self.field {
            DiskField::Probability(raster) => Some(raster),
            DiskField::Accessibility(_) => None,
        }
    }
}

/// Address of one disk computation. Orders chronologically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiskTask {
    pub segment: usize,
    pub index: usize,
}

/// Validated prism run over one trajectory.
pub struct PrismAssembler<'a, E: GridEngine + ?Sized> {
    trajectory: &'a Trajectory,
    engine: &'a E,
    config: PrismConfig,
    mode: PrismMode,
    window: GridWindow,
}

impl<'a, E: GridEngine + ?Sized> PrismAssembler<'a, E> {
    /// Check preconditions and fix the analysis window.
    ///
    /// # Errors
    /// - [`PrismError::InvalidConfig`] for out-of-range parameters
    /// - [`PrismError::DiskIntervalTooLarge`] when `disk_interval` exceeds the
    ///   trajectory's minimum interval (equality is allowed)
    /// - [`PrismError::Grid`] when the expanded extent cannot be rasterized
    pub fn new(
        trajectory: &'a Trajectory,
        config: &PrismConfig,
        mode: PrismMode,
        engine: &'a E,
    ) -> Result<Self, PrismError> {
        config.validate()?;
        let minimum = trajectory.minimum_disk_interval();
        if config.disk_interval > minimum {
            return Err(PrismError::DiskIntervalTooLarge {
                disk_interval: config.disk_interval,
                minimum,
            });
        }
        let extent = trajectory.extent().expand(config.expand_edges_factor);
        let window = GridWindow::new(extent, config.cell_size)?;
        Ok(Self {
            trajectory,
            engine,
            config: config.clone(),
            mode,
            window,
        })
    }

    pub fn window(&self) -> &GridWindow {
        &self.window
    }

    pub fn mode(&self) -> PrismMode {
        self.mode
    }

    /// Every (segment, disk) unit of work, in chronological order.
    pub fn tasks(&self) -> Vec<DiskTask> {
        self.trajectory
            .segments()
            .flat_map(|segment| {
                let count = disk_count(segment.elapsed_time(), self.config.disk_interval);
                (0..count).map(move |index| DiskTask {
                    segment: segment.index,
                    index,
                })
            })
            .collect()
    }

    /// Disk generator for one segment.
    pub fn segment_prism(&self, segment: &Segment<'_>) -> Result<SegmentPrism<'a, E>, GridError> {
        SegmentPrism::new(
            self.engine,
            self.window,
            segment,
            self.config.disk_interval,
            self.config.velocity_multiplier,
        )
    }

    /// Compute a single disk from scratch.
    ///
    /// Returns `Ok(None)` for a skipped probabilistic disk.
    pub fn compute(&self, task: DiskTask) -> Result<Option<Disk>, PrismError> {
        let segment = self
            .trajectory
            .segment(task.segment)
            .ok_or(PrismError::NoSuchSegment(task.segment))?;
        Ok(self.segment_prism(&segment)?.disk(task.index, self.mode)?)
    }

    fn segment_disks(&self, segment: &Segment<'_>) -> Result<Vec<Disk>, GridError> {
        let prism = self.segment_prism(segment)?;
        let count = prism.disk_count();
        debug!(
            segment = segment.index,
            elapsed_time = segment.elapsed_time(),
            velocity = segment.velocity(),
            disks = count,
            "generating segment disks"
        );
        let disks: Vec<Option<Disk>> = match self.config.execution {
            Execution::Sequential => (0..count)
                .map(|k| prism.disk(k, self.mode))
                .collect::<Result<_, _>>()?,
            Execution::Parallel => (0..count)
                .into_par_iter()
                .map(|k| prism.disk(k, self.mode))
                .collect::<Result<_, _>>()?,
        };
        Ok(disks.into_iter().flatten().collect())
    }

    /// Compute every disk and return them in chronological order.
    pub fn run(&self) -> Result<Vec<Disk>, PrismError> {
        // The terminal fix has no successor, so `segments()` never yields it.
        let segments: Vec<Segment<'_>> = self.trajectory.segments().collect();
        let per_segment: Vec<Vec<Disk>> = match self.config.execution {
            Execution::Sequential => segments
                .iter()
                .map(|s| self.segment_disks(s))
                .collect::<Result<_, _>>()?,
            Execution::Parallel => segments
                .par_iter()
                .map(|s| self.segment_disks(s))
                .collect::<Result<_, _>>()?,
        };

        let mut disks: Vec<Disk> = per_segment.into_iter().flatten().collect();
        disks.sort_by_key(Disk::task);

        let expected = self.tasks().len();
        info!(
            mode = %self.mode,
            segments = segments.len(),
            disks = disks.len(),
            skipped = expected - disks.len(),
            cols = self.window.cols(),
            rows = self.window.rows(),
            "prism generated"
        );
        Ok(disks)
    }
}

/// Generate the disk stack for `trajectory`.
pub fn generate<E: GridEngine + ?Sized>(
    trajectory: &Trajectory,
    config: &PrismConfig,
    mode: PrismMode,
    engine: &E,
) -> Result<Vec<Disk>, PrismError> {
    PrismAssembler::new(trajectory, config, mode, engine)?.run()
}

/// Classical voxel prism straight from a point source.
pub fn voxel_potential_path_area<S, E>(
    source: &S,
    config: &PrismConfig,
    engine: &E,
) -> Result<Vec<Disk>, PrismError>
where
    S: PointSource,
    E: GridEngine + ?Sized,
{
    let trajectory = Trajectory::from_source(source)?;
    generate(&trajectory, config, PrismMode::Classical, engine)
}

/// Probabilistic voxel prism straight from a point source.
pub fn probabilistic_space_time_prism<S, E>(
    source: &S,
    config: &PrismConfig,
    engine: &E,
) -> Result<Vec<Disk>, PrismError>
where
    S: PointSource,
    E: GridEngine + ?Sized,
{
    let trajectory = Trajectory::from_source(source)?;
    generate(&trajectory, config, PrismMode::Probabilistic, engine)
}
