use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use trajkit_core::error::{TrajError, TrajResult};
use trajkit_core::frame::Box3;
use trajkit_core::geom::Vec3;
use trajkit_core::pdb::{parse_atom_record, parse_cryst1};

use crate::TrajectoryFormat;

/// Multi-model PDB read as a trajectory, one `MODEL` block per frame.
///
/// Model offsets are indexed once at open, so seeking is a jump to the
/// recorded byte offset. A file without `MODEL` records is a single frame.
pub struct PdbTrajFormat {
    reader: BufReader<File>,
    path: PathBuf,
    offsets: Vec<u64>,
    n_atoms: usize,
    has_box: bool,
    global_box: Box3,
    box_: Box3,
    coords: Vec<Vec3>,
    next: usize,
    line: String,
}

impl PdbTrajFormat {
    pub fn open(path: impl AsRef<Path>) -> TrajResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = BufReader::new(File::open(&path)?);
        let index = index_models(&mut reader)?;
        if index.first_model_atoms == 0 {
            return Err(TrajError::Parse(format!(
                "no atoms found in PDB trajectory {}",
                path.display()
            )));
        }
        log::debug!(
            "indexed {} models of {} atoms in {}",
            index.offsets.len(),
            index.first_model_atoms,
            path.display()
        );
        Ok(Self {
            reader,
            path,
            offsets: index.offsets,
            n_atoms: index.first_model_atoms,
            has_box: index.has_box,
            global_box: index.global_box,
            box_: index.global_box,
            coords: Vec::with_capacity(index.first_model_atoms),
            next: 0,
            line: String::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrajectoryFormat for PdbTrajFormat {
    fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    fn timestep(&self) -> f64 {
        0.0
    }

    fn n_frames(&self) -> usize {
        self.offsets.len()
    }

    fn has_periodic_box(&self) -> bool {
        self.has_box
    }

    fn periodic_box(&self) -> Box3 {
        self.box_
    }

    fn coord(&self, index: usize) -> Option<Vec3> {
        self.coords.get(index).copied()
    }

    fn coords(&self) -> Vec<Vec3> {
        self.coords.clone()
    }

    fn parse_frame(&mut self) -> TrajResult<bool> {
        let Some(&offset) = self.offsets.get(self.next) else {
            return Ok(false);
        };
        self.reader.seek(SeekFrom::Start(offset))?;
        self.coords.clear();
        self.box_ = self.global_box;
        let mut first = true;
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                break;
            }
            let line = self.line.trim_end_matches(['\n', '\r']);
            if line.starts_with("MODEL") {
                if first {
                    first = false;
                    continue;
                }
                break;
            }
            first = false;
            if line.starts_with("ENDMDL") {
                break;
            }
            if line.starts_with("CRYST1") {
                self.box_ = parse_cryst1(line)?;
                continue;
            }
            if let Some(atom) = parse_atom_record(line, self.coords.len(), false)? {
                self.coords.push(Vec3::from_array(atom.position));
            }
        }
        if self.coords.len() != self.n_atoms {
            return Err(TrajError::Parse(format!(
                "model {} of {} has {} atoms, expected {}",
                self.next,
                self.path.display(),
                self.coords.len(),
                self.n_atoms
            )));
        }
        self.next += 1;
        Ok(true)
    }

    fn seek_next_frame(&mut self) -> TrajResult<()> {
        Ok(())
    }

    fn seek_frame(&mut self, index: usize) -> TrajResult<()> {
        if index >= self.offsets.len() {
            return Err(TrajError::OutOfRange {
                index,
                n_frames: self.offsets.len(),
            });
        }
        self.next = index;
        Ok(())
    }

    fn rewind(&mut self) -> TrajResult<()> {
        self.next = 0;
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "pdb"
    }
}

struct ModelIndex {
    offsets: Vec<u64>,
    first_model_atoms: usize,
    has_box: bool,
    global_box: Box3,
}

fn index_models<R: BufRead + Seek>(reader: &mut R) -> TrajResult<ModelIndex> {
    let mut offsets = Vec::new();
    // atoms before any MODEL record only form a frame when the file has no models
    let mut preamble_atoms = 0usize;
    let mut first_model_atoms = 0usize;
    let mut in_first_model = false;
    let mut has_box = false;
    let mut global_box = Box3::None;
    let mut pos = 0u64;
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            break;
        }
        let start = pos;
        pos += n as u64;
        if line.starts_with("MODEL") {
            in_first_model = offsets.is_empty();
            offsets.push(start);
        } else if line.starts_with("ENDMDL") {
            in_first_model = false;
        } else if line.starts_with("CRYST1") {
            let box_ = parse_cryst1(line.trim_end())?;
            if !box_.is_none() {
                has_box = true;
            }
            if offsets.is_empty() {
                global_box = box_;
            }
        } else if is_counted_atom(&line) {
            if offsets.is_empty() {
                preamble_atoms += 1;
            } else if in_first_model {
                first_model_atoms += 1;
            }
        }
    }
    if offsets.is_empty() {
        offsets.push(0);
        first_model_atoms = preamble_atoms;
    } else if preamble_atoms > 0 {
        log::warn!("ignoring {preamble_atoms} atom records before the first MODEL");
    }
    reader.seek(SeekFrom::Start(0))?;
    Ok(ModelIndex {
        offsets,
        first_model_atoms,
        has_box,
        global_box,
    })
}

fn is_counted_atom(line: &str) -> bool {
    if !(line.starts_with("ATOM") || line.starts_with("HETATM")) {
        return false;
    }
    let alt_loc = line.chars().nth(16).unwrap_or(' ');
    alt_loc == ' ' || alt_loc == 'A'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn atom_line(serial: usize, x: f64, y: f64, z: f64) -> String {
        format!(
            "ATOM  {serial:>5}  CA  ALA A{serial:>4}    {x:>8.3}{y:>8.3}{z:>8.3}  1.00  0.00\n"
        )
    }

    fn write_pdb(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn models_are_indexed_and_seekable() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::from(
            "CRYST1   30.000   30.000   30.000  90.00  90.00  90.00 P 1           1\n",
        );
        for model in 0..3 {
            body.push_str(&format!("MODEL     {:>4}\n", model + 1));
            body.push_str(&atom_line(1, model as f64, 0.0, 0.0));
            body.push_str(&atom_line(2, 0.0, model as f64, 0.0));
            body.push_str("ENDMDL\n");
        }
        body.push_str("END\n");
        let path = write_pdb(&dir, "traj.pdb", &body);

        let mut format = PdbTrajFormat::open(&path).unwrap();
        assert_eq!(format.n_frames(), 3);
        assert_eq!(format.n_atoms(), 2);
        assert!(format.has_periodic_box());
        assert_eq!(format.timestep(), 0.0);

        format.seek_frame(2).unwrap();
        assert!(format.parse_frame().unwrap());
        assert_eq!(format.coord(0), Some(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(
            format.periodic_box(),
            Box3::Orthorhombic {
                lx: 30.0,
                ly: 30.0,
                lz: 30.0
            }
        );
        assert!(!format.parse_frame().unwrap());

        format.rewind().unwrap();
        assert!(format.parse_frame().unwrap());
        assert_eq!(format.coord(1), Some(Vec3::new(0.0, 0.0, 0.0)));
    }

    #[test]
    fn file_without_models_is_one_frame() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("{}{}END\n", atom_line(1, 1.0, 2.0, 3.0), atom_line(2, 4.0, 5.0, 6.0));
        let path = write_pdb(&dir, "single.pdb", &body);
        let mut format = PdbTrajFormat::open(&path).unwrap();
        assert_eq!(format.n_frames(), 1);
        assert!(!format.has_periodic_box());
        assert!(format.parse_frame().unwrap());
        assert_eq!(
            format.coords(),
            vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)]
        );
    }

    #[test]
    fn short_model_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "MODEL        1\n{}{}ENDMDL\nMODEL        2\n{}ENDMDL\n",
            atom_line(1, 0.0, 0.0, 0.0),
            atom_line(2, 1.0, 0.0, 0.0),
            atom_line(1, 0.0, 0.0, 0.0)
        );
        let path = write_pdb(&dir, "short.pdb", &body);
        let mut format = PdbTrajFormat::open(&path).unwrap();
        assert!(format.parse_frame().unwrap());
        assert!(matches!(format.parse_frame(), Err(TrajError::Parse(_))));
    }

    #[test]
    fn atoms_before_first_model_are_not_a_frame() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{}MODEL        1\n{}{}ENDMDL\n{}MODEL        2\n{}{}ENDMDL\n",
            atom_line(1, 9.0, 9.0, 9.0),
            atom_line(1, 0.0, 0.0, 0.0),
            atom_line(2, 1.0, 0.0, 0.0),
            atom_line(3, 8.0, 8.0, 8.0),
            atom_line(1, 0.0, 2.0, 0.0),
            atom_line(2, 1.0, 2.0, 0.0)
        );
        let path = write_pdb(&dir, "preamble.pdb", &body);
        let mut format = PdbTrajFormat::open(&path).unwrap();
        assert_eq!(format.n_atoms(), 2);
        assert_eq!(format.n_frames(), 2);
        assert!(format.parse_frame().unwrap());
        assert_eq!(format.coord(1), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert!(format.parse_frame().unwrap());
        assert_eq!(format.coord(0), Some(Vec3::new(0.0, 2.0, 0.0)));
    }

    #[test]
    fn empty_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdb(&dir, "empty.pdb", "REMARK nothing here\nEND\n");
        assert!(PdbTrajFormat::open(&path).is_err());
    }
}
