pub mod dcd;
pub mod memory;
pub mod pdb_traj;
pub mod trajectory;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use trajkit_core::error::{TrajError, TrajResult};
use trajkit_core::frame::Box3;
use trajkit_core::geom::Vec3;
use trajkit_core::pdb::{parse_pdb_reader, PdbParseOptions};
use trajkit_core::system::AtomGroup;

pub use dcd::DcdFormat;
pub use memory::MemoryFormat;
pub use pdb_traj::PdbTrajFormat;
pub use trajectory::{TrajState, Trajectory};

/// Format-specific half of a trajectory.
///
/// Implementations decode frames into their own buffer and position their
/// stream; all cursor bookkeeping lives in [`Trajectory`], which is the only
/// caller of these hooks.
pub trait TrajectoryFormat {
    fn n_atoms(&self) -> usize;
    fn timestep(&self) -> f64;
    fn n_frames(&self) -> usize;
    fn has_periodic_box(&self) -> bool;

    /// Cell of the buffered frame.
    fn periodic_box(&self) -> Box3;

    /// Coordinate of frame slot `index` in the buffered frame.
    fn coord(&self, index: usize) -> Option<Vec3>;

    fn coords(&self) -> Vec<Vec3> {
        (0..self.n_atoms()).filter_map(|i| self.coord(i)).collect()
    }

    /// Decodes the frame at the current stream position into the buffer.
    /// Returns `Ok(false)` at end of stream.
    fn parse_frame(&mut self) -> TrajResult<bool>;

    /// Positions the stream on the frame following the buffered one.
    fn seek_next_frame(&mut self) -> TrajResult<()>;

    /// Positions the stream so the next `parse_frame` decodes `index`.
    fn seek_frame(&mut self, index: usize) -> TrajResult<()>;

    fn rewind(&mut self) -> TrajResult<()>;

    fn format_name(&self) -> &'static str;
}

impl<T: TrajectoryFormat + ?Sized> TrajectoryFormat for Box<T> {
    fn n_atoms(&self) -> usize {
        (**self).n_atoms()
    }

    fn timestep(&self) -> f64 {
        (**self).timestep()
    }

    fn n_frames(&self) -> usize {
        (**self).n_frames()
    }

    fn has_periodic_box(&self) -> bool {
        (**self).has_periodic_box()
    }

    fn periodic_box(&self) -> Box3 {
        (**self).periodic_box()
    }

    fn coord(&self, index: usize) -> Option<Vec3> {
        (**self).coord(index)
    }

    fn coords(&self) -> Vec<Vec3> {
        (**self).coords()
    }

    fn parse_frame(&mut self) -> TrajResult<bool> {
        (**self).parse_frame()
    }

    fn seek_next_frame(&mut self) -> TrajResult<()> {
        (**self).seek_next_frame()
    }

    fn seek_frame(&mut self, index: usize) -> TrajResult<()> {
        (**self).seek_frame(index)
    }

    fn rewind(&mut self) -> TrajResult<()> {
        (**self).rewind()
    }

    fn format_name(&self) -> &'static str {
        (**self).format_name()
    }
}

/// Loads a structure file as the model whose atom indices address frame slots.
pub fn read_model(path: impl AsRef<Path>) -> TrajResult<AtomGroup> {
    let path = path.as_ref();
    match extension(path).as_str() {
        "pdb" | "ent" => {
            let file = File::open(path)?;
            let options = PdbParseOptions {
                strict: false,
                only_first_model: true,
            };
            let parsed = parse_pdb_reader(BufReader::new(file), &options)?;
            let model = parsed.into_group();
            log::debug!("read model {} with {} atoms", path.display(), model.len());
            Ok(model)
        }
        other => Err(TrajError::Unsupported(format!(
            "unknown model format '{other}' for {}",
            path.display()
        ))),
    }
}

/// Opens a trajectory by file extension, with frame 0 already buffered.
///
/// The trajectory must carry exactly as many atoms as `model`.
pub fn open_trajectory(path: impl AsRef<Path>, model: &AtomGroup) -> TrajResult<Trajectory> {
    let path = path.as_ref();
    let format: Box<dyn TrajectoryFormat> = match extension(path).as_str() {
        "dcd" => Box::new(DcdFormat::open(path)?),
        "pdb" | "ent" => Box::new(PdbTrajFormat::open(path)?),
        other => {
            return Err(TrajError::Unsupported(format!(
                "unknown trajectory format '{other}' for {}",
                path.display()
            )))
        }
    };
    if format.n_atoms() != model.len() {
        return Err(TrajError::Mismatch(format!(
            "trajectory {} has {} atoms but the model has {}",
            path.display(),
            format.n_atoms(),
            model.len()
        )));
    }
    let traj = Trajectory::new(format)?;
    log::info!(
        "opened {} trajectory {}: {} atoms, {} frames, timestep {}",
        traj.format_name(),
        path.display(),
        traj.n_atoms(),
        traj.n_frames(),
        traj.timestep()
    );
    Ok(traj)
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}
