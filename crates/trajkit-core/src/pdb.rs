use std::io::BufRead;

use crate::error::{TrajError, TrajResult};
use crate::frame::Box3;
use crate::geom::Vec3;
use crate::system::{Atom, AtomGroup};

#[derive(Clone, Debug)]
pub struct PdbAtom {
    pub serial: i32,
    pub name: String,
    pub resname: String,
    pub chain: char,
    pub resid: i32,
    pub segid: String,
    pub position: [f64; 3],
}

#[derive(Clone, Debug)]
pub struct PdbParseOptions {
    pub strict: bool,
    pub only_first_model: bool,
}

impl Default for PdbParseOptions {
    fn default() -> Self {
        Self {
            strict: true,
            only_first_model: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PdbParseResult {
    pub atoms: Vec<PdbAtom>,
    pub box_: Box3,
}

impl PdbParseResult {
    /// Converts parsed records into a model; atom `index` follows file order.
    pub fn into_group(self) -> AtomGroup {
        let mut group = AtomGroup::new();
        for (index, atom) in self.atoms.into_iter().enumerate() {
            group.push(Atom {
                id: index as i32 + 1,
                index,
                name: atom.name,
                resname: atom.resname,
                resid: atom.resid,
                chain: atom.chain.to_string().trim().to_string(),
                segid: atom.segid,
                coords: Vec3::from_array(atom.position),
            });
        }
        group.set_periodic_box(self.box_);
        group
    }
}

pub fn parse_pdb_reader<R: BufRead>(
    reader: R,
    options: &PdbParseOptions,
) -> TrajResult<PdbParseResult> {
    let mut atoms = Vec::new();
    let mut box_ = Box3::None;
    let mut in_model = false;
    let mut saw_model = false;

    for line in reader.lines() {
        let line = line?;
        if line.starts_with("MODEL") {
            if options.only_first_model && saw_model {
                break;
            }
            if !saw_model && !atoms.is_empty() {
                log::warn!("ignoring {} atom records before the first MODEL", atoms.len());
                atoms.clear();
            }
            saw_model = true;
            in_model = true;
            continue;
        }
        if line.starts_with("ENDMDL") {
            if options.only_first_model && saw_model {
                break;
            }
            if saw_model {
                in_model = false;
            }
            continue;
        }
        if line.starts_with("CRYST1") {
            box_ = parse_cryst1(&line)?;
            continue;
        }
        if saw_model && !in_model {
            continue;
        }
        if let Some(atom) = parse_atom_record(&line, atoms.len(), options.strict)? {
            atoms.push(atom);
        }
    }

    if atoms.is_empty() {
        return Err(TrajError::Parse("no atoms found in PDB".into()));
    }
    Ok(PdbParseResult { atoms, box_ })
}

/// Parses an `ATOM`/`HETATM` line. Other records and alternate locations
/// beyond `A` yield `None`.
pub fn parse_atom_record(line: &str, ordinal: usize, strict: bool) -> TrajResult<Option<PdbAtom>> {
    if !(line.starts_with("ATOM") || line.starts_with("HETATM")) {
        return Ok(None);
    }
    let alt_loc = slice_char(line, 16).unwrap_or(' ');
    if alt_loc != ' ' && alt_loc != 'A' {
        return Ok(None);
    }
    let serial = parse_int_opt(slice_trim_opt(line, 6, 11), "serial", strict)?
        .unwrap_or((ordinal + 1) as i32);
    let name = slice_required(line, 12, 16, "name", strict)?;
    let resname = slice_required(line, 17, 20, "resname", strict)?;
    let chain = slice_char(line, 21).unwrap_or(' ');
    let resid = parse_int_opt(slice_trim_opt(line, 22, 26), "resid", strict)?.unwrap_or(1);
    let x = parse_float(slice_trim_opt(line, 30, 38), "x")?;
    let y = parse_float(slice_trim_opt(line, 38, 46), "y")?;
    let z = parse_float(slice_trim_opt(line, 46, 54), "z")?;
    let segid = slice_required(line, 72, 76, "segid", false)?;
    Ok(Some(PdbAtom {
        serial,
        name,
        resname,
        chain,
        resid,
        segid,
        position: [x, y, z],
    }))
}

/// Reads the unit cell from a `CRYST1` record (lengths in Å, angles in degrees).
pub fn parse_cryst1(line: &str) -> TrajResult<Box3> {
    let a = parse_float(slice_trim_opt(line, 6, 15), "cryst1 a")?;
    let b = parse_float(slice_trim_opt(line, 15, 24), "cryst1 b")?;
    let c = parse_float(slice_trim_opt(line, 24, 33), "cryst1 c")?;
    let alpha = parse_float(slice_trim_opt(line, 33, 40), "cryst1 alpha")?;
    let beta = parse_float(slice_trim_opt(line, 40, 47), "cryst1 beta")?;
    let gamma = parse_float(slice_trim_opt(line, 47, 54), "cryst1 gamma")?;
    // 1 Å cubic cells are the conventional "no cell" placeholder
    if a <= 1.0 && b <= 1.0 && c <= 1.0 {
        return Ok(Box3::None);
    }
    Ok(Box3::from_lengths_angles(
        a,
        b,
        c,
        alpha.to_radians(),
        beta.to_radians(),
        gamma.to_radians(),
    ))
}

fn slice_trim_opt(line: &str, start: usize, end: usize) -> Option<&str> {
    if line.len() < start {
        return None;
    }
    let end = end.min(line.len());
    line.get(start..end).map(str::trim)
}

fn slice_required(
    line: &str,
    start: usize,
    end: usize,
    label: &str,
    strict: bool,
) -> TrajResult<String> {
    match slice_trim_opt(line, start, end) {
        Some(value) => Ok(value.to_string()),
        None => {
            if strict {
                Err(TrajError::Parse(format!("missing {label} field")))
            } else {
                Ok(String::new())
            }
        }
    }
}

fn slice_char(line: &str, idx: usize) -> Option<char> {
    line.chars().nth(idx)
}

fn parse_int_opt(value: Option<&str>, label: &str, strict: bool) -> TrajResult<Option<i32>> {
    let Some(raw) = value else {
        if strict {
            return Err(TrajError::Parse(format!("missing {label} field")));
        }
        return Ok(None);
    };
    if raw.is_empty() {
        if strict {
            return Err(TrajError::Parse(format!("missing {label} field")));
        }
        return Ok(None);
    }
    raw.parse::<i32>()
        .map(Some)
        .map_err(|_| TrajError::Parse(format!("invalid {label} '{raw}'")))
        .or_else(|err| if strict { Err(err) } else { Ok(None) })
}

fn parse_float(value: Option<&str>, label: &str) -> TrajResult<f64> {
    let Some(raw) = value else {
        return Err(TrajError::Parse(format!("missing {label} field")));
    };
    raw.parse::<f64>()
        .map_err(|_| TrajError::Parse(format!("invalid {label} '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn multi_model_fixture() -> &'static str {
        "CRYST1   30.000   40.000   50.000  90.00  90.00  90.00 P 1           1\n\
MODEL        1\n\
ATOM      1  N   ALA A   1       1.000   0.000   0.000  1.00 20.00           N\n\
ATOM      2  CA  ALA A   1       2.000   0.000   0.000  1.00 20.00           C\n\
ENDMDL\n\
MODEL        2\n\
ATOM      1  N   ALA A   1       3.000   0.000   0.000  1.00 20.00           N\n\
ATOM      2  CA  ALA A   1       4.000   0.000   0.000  1.00 20.00           C\n\
ENDMDL\n"
    }

    #[test]
    fn parse_first_model_with_cell() {
        let parsed =
            parse_pdb_reader(Cursor::new(multi_model_fixture()), &PdbParseOptions::default())
                .expect("parse");
        assert_eq!(parsed.atoms.len(), 2);
        assert!((parsed.atoms[1].position[0] - 2.0).abs() < 1e-9);
        assert_eq!(
            parsed.box_,
            Box3::Orthorhombic {
                lx: 30.0,
                ly: 40.0,
                lz: 50.0
            }
        );
    }

    #[test]
    fn into_group_assigns_indices_in_file_order() {
        let parsed =
            parse_pdb_reader(Cursor::new(multi_model_fixture()), &PdbParseOptions::default())
                .expect("parse");
        let group = parsed.into_group();
        assert_eq!(group.len(), 2);
        let ca = group.get(1).unwrap();
        assert_eq!(ca.id, 2);
        assert_eq!(ca.index, 1);
        assert_eq!(ca.name, "CA");
        assert_eq!(ca.chain, "A");
        assert!(group.is_periodic());
    }

    #[test]
    fn atoms_before_first_model_are_dropped() {
        let text = "ATOM      1  CB  ALA A   1       9.000   9.000   9.000  1.00 20.00\n\
MODEL        1\n\
ATOM      1  N   ALA A   1       1.000   0.000   0.000  1.00 20.00\n\
ATOM      2  CA  ALA A   1       2.000   0.000   0.000  1.00 20.00\n\
ENDMDL\n";
        let parsed = parse_pdb_reader(Cursor::new(text), &PdbParseOptions::default()).expect("parse");
        assert_eq!(parsed.atoms.len(), 2);
        assert_eq!(parsed.atoms[0].name, "N");
    }

    #[test]
    fn empty_file_is_a_parse_error() {
        let err = parse_pdb_reader(Cursor::new("REMARK nothing\n"), &PdbParseOptions::default())
            .unwrap_err();
        assert!(matches!(err, TrajError::Parse(_)));
    }

    #[test]
    fn placeholder_cell_is_ignored() {
        let line = "CRYST1    1.000    1.000    1.000  90.00  90.00  90.00 P 1           1";
        assert_eq!(parse_cryst1(line).unwrap(), Box3::None);
    }
}
