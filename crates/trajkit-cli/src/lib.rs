//! Command-line front ends: run configuration, the `rmsds` pipeline and the
//! `bounding` selection report.

pub mod bounding;
pub mod config;
pub mod run;

pub use bounding::{bounding, BoundingCli, BoundingReport};
pub use config::{load_config, log_filter, Cli, RunConfig, SystemSpec};
pub use run::{run, write_report, LoadedSystem};
