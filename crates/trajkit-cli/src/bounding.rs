//! Extent of an atom selection in a structure file.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

use trajkit_core::error::{TrajError, TrajResult};
use trajkit_core::frame::Box3;
use trajkit_core::geom::Vec3;
use trajkit_io::read_model;

#[derive(Parser, Debug)]
#[command(
    name = "bounding",
    version,
    about = "Atom count, centroid and axis-aligned bounds of a selection"
)]
pub struct BoundingCli {
    /// Structure file (PDB)
    pub model: PathBuf,
    /// Atom selection, e.g. 'name CA and resid 10-40'
    pub selection: String,
    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundingReport {
    pub n_atoms: usize,
    pub centroid: Vec3,
    pub min: Vec3,
    pub max: Vec3,
    pub periodic_box: Box3,
}

impl BoundingReport {
    pub fn write<W: Write>(&self, out: &mut W) -> TrajResult<()> {
        writeln!(out, "{} atoms in subset.", self.n_atoms)?;
        writeln!(out, "Centroid at {}", self.centroid)?;
        writeln!(out, "Bounds: {} x {}", self.min, self.max)?;
        if let (Some(lengths), Some(volume)) =
            (self.periodic_box.lengths(), self.periodic_box.volume())
        {
            writeln!(out, "Periodic box: {lengths} volume {volume:.3}")?;
        }
        Ok(())
    }
}

pub fn bounding(model: &Path, selection: &str) -> TrajResult<BoundingReport> {
    let structure = read_model(model)?;
    let subset = structure.select(selection)?;
    let (min, max) = subset
        .bounding_box()
        .ok_or_else(|| TrajError::InvalidSelection(format!("selection '{selection}' is empty")))?;
    log::info!(
        "{}: {} of {} atoms selected",
        model.display(),
        subset.len(),
        structure.len()
    );
    Ok(BoundingReport {
        n_atoms: subset.len(),
        centroid: subset.centroid(),
        min,
        max,
        periodic_box: structure.periodic_box(),
    })
}
