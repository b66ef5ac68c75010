//! Pairwise structural comparison of trajectory frames.
//!
//! Frames of an atom subset are gathered into a [`CoordinateMatrix`] (or
//! re-read on demand through [`TrajectoryFrames`]), centered, and compared
//! with the singular-value form of the least-RMSD superposition.

pub mod cache;
pub mod matrix;
pub mod pairwise;
pub mod progress;
pub mod superpose;
pub mod svd;

pub use cache::{
    estimate_cache_bytes, physical_memory_bytes, read_coords, CoordinateMatrix, FrameSource,
    TrajectoryFrames,
};
pub use matrix::{MatrixKind, MatrixStats, RmsdMatrix};
pub use pairwise::{
    cross_rmsd, cross_rmsd_parallel, pair_count, pairwise_rmsd, pairwise_rmsd_parallel,
};
pub use progress::{PercentTrigger, ProgressCounter, ProgressReport, ProgressSink};
pub use superpose::{center_at_origin, Superposer};
pub use svd::{JacobiSvd, NalgebraSvd, Svd3, SvdBackend};

#[cfg(test)]
mod tests;
