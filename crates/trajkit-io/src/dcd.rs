use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use trajkit_core::error::{TrajError, TrajResult};
use trajkit_core::frame::Box3;
use trajkit_core::geom::Vec3;

use crate::TrajectoryFormat;

#[derive(Debug, Clone, Copy)]
enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy)]
enum UnitCellLayout {
    StandardAbcAngles,
    CharmmAgBcAngles,
}

const DCD_IO_BUFFER_BYTES: usize = 1024 * 1024;

/// CHARMM/NAMD DCD trajectory.
///
/// Every frame record has the same size, so seeking is a single jump to
/// `data_start + index * frame_bytes`. Coordinates are stored per axis and
/// kept that way in the frame buffer.
#[derive(Debug)]
pub struct DcdFormat {
    file: BufReader<File>,
    path: PathBuf,
    endian: Endian,
    marker_size: usize,
    n_atoms: usize,
    n_frames: usize,
    timestep: f64,
    data_start: u64,
    frame_bytes: u64,
    cell_len: Option<u64>,
    unitcell_layout: UnitCellLayout,
    box_: Box3,
    axis_buf: Vec<u8>,
    x: Vec<f32>,
    y: Vec<f32>,
    z: Vec<f32>,
}

impl DcdFormat {
    pub fn open(path: impl AsRef<Path>) -> TrajResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let file_len = file.metadata()?.len();
        let mut file = BufReader::with_capacity(DCD_IO_BUFFER_BYTES, file);
        let (endian, marker_size, header_len) = detect_header_marker(&mut file)?;
        let header_len_usize = usize::try_from(header_len)
            .map_err(|_| TrajError::Parse("DCD header length too large".into()))?;
        let mut header = vec![0u8; header_len_usize];
        file.read_exact(&mut header)?;
        let trailer = read_marker(&mut file, endian, marker_size)?;
        if trailer != header_len {
            return Err(TrajError::Parse("DCD header record length mismatch".into()));
        }
        if &header[0..4] != b"CORD" {
            return Err(TrajError::Parse("DCD header does not start with CORD".into()));
        }
        let header_frames = icntrl(&header, 0, endian);
        if icntrl(&header, 8, endian) != 0 {
            return Err(TrajError::Unsupported(
                "DCD files with fixed atoms are not supported".into(),
            ));
        }
        if icntrl(&header, 11, endian) != 0 {
            return Err(TrajError::Unsupported(
                "DCD files with a fourth dimension are not supported".into(),
            ));
        }
        let charmm_version = icntrl(&header, 19, endian);
        let timestep = parse_timestep(&header, endian, charmm_version > 0);
        let unitcell_layout = if charmm_version > 0 {
            UnitCellLayout::CharmmAgBcAngles
        } else {
            UnitCellLayout::StandardAbcAngles
        };

        // Skip title record
        skip_record(&mut file, endian, marker_size)?;

        // Read natoms record
        let natoms_len = read_marker(&mut file, endian, marker_size)?;
        if natoms_len != 4 {
            return Err(TrajError::Parse("unexpected natoms record length".into()));
        }
        let natoms = read_i32(&mut file, endian)?;
        let natoms_end = read_marker(&mut file, endian, marker_size)?;
        if natoms_end != natoms_len {
            return Err(TrajError::Parse("natoms record length mismatch".into()));
        }
        if natoms <= 0 {
            return Err(TrajError::Parse("invalid natoms".into()));
        }
        let n_atoms = natoms as usize;
        let data_start = file.stream_position()?;

        // CHARMM writers declare the unit cell in icntrl[10]; X-PLOR headers
        // use that slot for DELTA, so there the first record is inspected.
        let coord_len = (n_atoms * 4) as u64;
        let first_len = read_marker_opt(&mut file, endian, marker_size)?;
        file.seek(SeekFrom::Start(data_start))?;
        let cell_len = if charmm_version > 0 {
            if icntrl(&header, 10, endian) != 0 {
                match first_len {
                    Some(len) if is_unitcell_len(len) => Some(len),
                    Some(len) => {
                        return Err(TrajError::Parse(format!(
                            "DCD header declares a unit cell but the first record holds {len} bytes"
                        )))
                    }
                    // no frames to read the cell length from
                    None => Some(48),
                }
            } else {
                None
            }
        } else {
            first_len.filter(|&len| len != coord_len && is_unitcell_len(len))
        };

        let marker = marker_size as u64;
        let coord_record = 2 * marker + coord_len;
        let frame_bytes = 3 * coord_record + cell_len.map(|len| 2 * marker + len).unwrap_or(0);
        let available = (file_len.saturating_sub(data_start) / frame_bytes) as usize;
        if header_frames > 0 && header_frames as usize != available {
            log::warn!(
                "DCD {} header declares {header_frames} frames but the file holds {available}; using {available}",
                path.display()
            );
        }

        Ok(Self {
            file,
            path,
            endian,
            marker_size,
            n_atoms,
            n_frames: available,
            timestep,
            data_start,
            frame_bytes,
            cell_len,
            unitcell_layout,
            box_: Box3::None,
            axis_buf: Vec::with_capacity(n_atoms.saturating_mul(4)),
            x: Vec::with_capacity(n_atoms),
            y: Vec::with_capacity(n_atoms),
            z: Vec::with_capacity(n_atoms),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrajectoryFormat for DcdFormat {
    fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    fn timestep(&self) -> f64 {
        self.timestep
    }

    fn n_frames(&self) -> usize {
        self.n_frames
    }

    fn has_periodic_box(&self) -> bool {
        self.cell_len.is_some()
    }

    fn periodic_box(&self) -> Box3 {
        self.box_
    }

    fn coord(&self, index: usize) -> Option<Vec3> {
        let x = *self.x.get(index)?;
        let y = *self.y.get(index)?;
        let z = *self.z.get(index)?;
        Some(Vec3::new(x as f64, y as f64, z as f64))
    }

    fn parse_frame(&mut self) -> TrajResult<bool> {
        let expected_len = (self.n_atoms * 4) as u64;
        let mut len = match read_marker_opt(&mut self.file, self.endian, self.marker_size)? {
            Some(l) => l,
            None => return Ok(false),
        };

        if let Some(cell_len) = self.cell_len {
            if len != cell_len {
                return Err(TrajError::Parse(format!(
                    "unexpected DCD unit-cell record length {len}, expected {cell_len}"
                )));
            }
            self.box_ = read_unitcell_with_len(
                &mut self.file,
                self.endian,
                self.marker_size,
                len,
                self.unitcell_layout,
            )?;
            len = read_marker(&mut self.file, self.endian, self.marker_size)?;
        }

        if len != expected_len {
            return Err(TrajError::Parse(
                "unexpected DCD coordinate record length".into(),
            ));
        }
        read_axis_payload_into_buffer(
            &mut self.file,
            self.endian,
            self.marker_size,
            self.n_atoms,
            len,
            &mut self.axis_buf,
            &mut self.x,
        )?;
        let len_y = read_marker(&mut self.file, self.endian, self.marker_size)?;
        read_axis_payload_into_buffer(
            &mut self.file,
            self.endian,
            self.marker_size,
            self.n_atoms,
            len_y,
            &mut self.axis_buf,
            &mut self.y,
        )?;
        let len_z = read_marker(&mut self.file, self.endian, self.marker_size)?;
        read_axis_payload_into_buffer(
            &mut self.file,
            self.endian,
            self.marker_size,
            self.n_atoms,
            len_z,
            &mut self.axis_buf,
            &mut self.z,
        )?;
        Ok(true)
    }

    fn seek_next_frame(&mut self) -> TrajResult<()> {
        // records are read back to back; the stream already sits on the next frame
        Ok(())
    }

    fn seek_frame(&mut self, index: usize) -> TrajResult<()> {
        if index >= self.n_frames {
            return Err(TrajError::OutOfRange {
                index,
                n_frames: self.n_frames,
            });
        }
        let offset = self.data_start + index as u64 * self.frame_bytes;
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn rewind(&mut self) -> TrajResult<()> {
        self.file.seek(SeekFrom::Start(self.data_start))?;
        Ok(())
    }

    fn format_name(&self) -> &'static str {
        "dcd"
    }
}

fn icntrl(header: &[u8], k: usize, endian: Endian) -> i32 {
    let start = 4 + 4 * k;
    match header.get(start..start + 4) {
        Some(raw) => {
            let raw = [raw[0], raw[1], raw[2], raw[3]];
            match endian {
                Endian::Little => i32::from_le_bytes(raw),
                Endian::Big => i32::from_be_bytes(raw),
            }
        }
        None => 0,
    }
}

/// CHARMM stores DELTA as f32 in icntrl[9]; X-PLOR as f64 over icntrl[9..11].
fn parse_timestep(header: &[u8], endian: Endian, charmm: bool) -> f64 {
    if charmm {
        let raw = [header[40], header[41], header[42], header[43]];
        let v = match endian {
            Endian::Little => f32::from_le_bytes(raw),
            Endian::Big => f32::from_be_bytes(raw),
        };
        v as f64
    } else {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&header[40..48]);
        match endian {
            Endian::Little => f64::from_le_bytes(raw),
            Endian::Big => f64::from_be_bytes(raw),
        }
    }
}

fn read_axis_payload_into_buffer(
    file: &mut impl Read,
    endian: Endian,
    marker_size: usize,
    count: usize,
    len: u64,
    axis_buf: &mut Vec<u8>,
    axis_f32: &mut Vec<f32>,
) -> TrajResult<()> {
    let expected_len = (count * 4) as u64;
    if len != expected_len {
        return Err(TrajError::Parse("unexpected float record length".into()));
    }
    if axis_f32.len() != count {
        axis_f32.resize(count, 0.0);
    }
    if little_endian_fast_path(endian) {
        let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut axis_f32[..count]);
        file.read_exact(dst)?;
    } else {
        let need = count * 4;
        if axis_buf.len() < need {
            axis_buf.resize(need, 0);
        }
        file.read_exact(&mut axis_buf[..need])?;
        let bytes = &axis_buf[..need];
        for (i, chunk) in bytes.chunks_exact(4).enumerate() {
            let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
            axis_f32[i] = match endian {
                Endian::Little => f32::from_le_bytes(raw),
                Endian::Big => f32::from_be_bytes(raw),
            };
        }
    }
    let end_len = read_marker(file, endian, marker_size)?;
    if end_len != len {
        return Err(TrajError::Parse("float record length mismatch".into()));
    }
    Ok(())
}

#[inline]
fn little_endian_fast_path(endian: Endian) -> bool {
    cfg!(target_endian = "little") && matches!(endian, Endian::Little)
}

fn detect_header_marker(file: &mut (impl Read + Seek)) -> TrajResult<(Endian, usize, u64)> {
    let mut buf = [0u8; 8];
    file.read_exact(&mut buf)?;
    let len64_le = u64::from_le_bytes(buf);
    let len64_be = u64::from_be_bytes(buf);
    if is_header_len(len64_le) {
        return Ok((Endian::Little, 8, len64_le));
    }
    if is_header_len(len64_be) {
        return Ok((Endian::Big, 8, len64_be));
    }
    file.seek(SeekFrom::Start(0))?;
    let mut buf4 = [0u8; 4];
    file.read_exact(&mut buf4)?;
    let len_le = u32::from_le_bytes(buf4) as u64;
    let len_be = u32::from_be_bytes(buf4) as u64;
    if is_header_len(len_le) {
        Ok((Endian::Little, 4, len_le))
    } else if is_header_len(len_be) {
        Ok((Endian::Big, 4, len_be))
    } else {
        Err(TrajError::Unsupported(
            "unsupported DCD record marker".into(),
        ))
    }
}

fn is_header_len(len: u64) -> bool {
    matches!(len, 84 | 164)
}

fn is_unitcell_len(len: u64) -> bool {
    matches!(len, 48 | 24)
}

fn read_marker(file: &mut impl Read, endian: Endian, marker_size: usize) -> TrajResult<u64> {
    read_marker_opt(file, endian, marker_size)?.ok_or_else(|| {
        TrajError::Parse("DCD record truncated".into())
    })
}

fn read_marker_opt(
    file: &mut impl Read,
    endian: Endian,
    marker_size: usize,
) -> TrajResult<Option<u64>> {
    match marker_size {
        4 => {
            let mut buf = [0u8; 4];
            match file.read_exact(&mut buf) {
                Ok(()) => Ok(Some(match endian {
                    Endian::Little => u32::from_le_bytes(buf) as u64,
                    Endian::Big => u32::from_be_bytes(buf) as u64,
                })),
                Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
                Err(err) => Err(err.into()),
            }
        }
        8 => {
            let mut buf = [0u8; 8];
            match file.read_exact(&mut buf) {
                Ok(()) => Ok(Some(match endian {
                    Endian::Little => u64::from_le_bytes(buf),
                    Endian::Big => u64::from_be_bytes(buf),
                })),
                Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
                Err(err) => Err(err.into()),
            }
        }
        _ => Err(TrajError::Unsupported("unsupported DCD marker size".into())),
    }
}

fn read_i32(file: &mut impl Read, endian: Endian) -> TrajResult<i32> {
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    Ok(match endian {
        Endian::Little => i32::from_le_bytes(buf),
        Endian::Big => i32::from_be_bytes(buf),
    })
}

fn read_f32(file: &mut impl Read, endian: Endian) -> TrajResult<f32> {
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    Ok(match endian {
        Endian::Little => f32::from_le_bytes(buf),
        Endian::Big => f32::from_be_bytes(buf),
    })
}

fn read_f64(file: &mut impl Read, endian: Endian) -> TrajResult<f64> {
    let mut buf = [0u8; 8];
    file.read_exact(&mut buf)?;
    Ok(match endian {
        Endian::Little => f64::from_le_bytes(buf),
        Endian::Big => f64::from_be_bytes(buf),
    })
}

fn skip_record(file: &mut impl Read, endian: Endian, marker_size: usize) -> TrajResult<()> {
    let len = read_marker(file, endian, marker_size)?;
    let mut remain = len as usize;
    let mut scratch = [0u8; 256];
    while remain > 0 {
        let take = remain.min(scratch.len());
        file.read_exact(&mut scratch[..take])?;
        remain -= take;
    }
    let end_len = read_marker(file, endian, marker_size)?;
    if end_len != len {
        return Err(TrajError::Parse("record length mismatch".into()));
    }
    Ok(())
}

fn read_unitcell_with_len(
    file: &mut impl Read,
    endian: Endian,
    marker_size: usize,
    len: u64,
    layout: UnitCellLayout,
) -> TrajResult<Box3> {
    let mut values = [0.0f64; 6];
    if len == 24 {
        for value in values.iter_mut() {
            *value = read_f32(file, endian)? as f64;
        }
    } else {
        for value in values.iter_mut() {
            *value = read_f64(file, endian)?;
        }
    }
    let end_len = read_marker(file, endian, marker_size)?;
    if end_len != len {
        return Err(TrajError::Parse("unitcell record length mismatch".into()));
    }

    let primary = box_from_values(values, layout);
    if !primary.is_none() {
        return Ok(primary);
    }
    // Producers disagree on the layout; try the other one before giving up.
    let alternate = match layout {
        UnitCellLayout::StandardAbcAngles => UnitCellLayout::CharmmAgBcAngles,
        UnitCellLayout::CharmmAgBcAngles => UnitCellLayout::StandardAbcAngles,
    };
    Ok(box_from_values(values, alternate))
}

fn box_from_values(values: [f64; 6], layout: UnitCellLayout) -> Box3 {
    let (a, b, c, alpha, beta, gamma) = match layout {
        UnitCellLayout::StandardAbcAngles => (
            values[0], values[1], values[2], values[3], values[4], values[5],
        ),
        // CHARMM/OpenMM order:
        // [A, gamma, B, beta, alpha, C], where angles can be cosines or degrees.
        UnitCellLayout::CharmmAgBcAngles => (
            values[0], values[2], values[5], values[4], values[3], values[1],
        ),
    };
    Box3::from_lengths_angles(
        a,
        b,
        c,
        unitcell_angle_to_radians(alpha),
        unitcell_angle_to_radians(beta),
        unitcell_angle_to_radians(gamma),
    )
}

fn unitcell_angle_to_radians(value: f64) -> f64 {
    if value.abs() <= 1.0 {
        value.clamp(-1.0, 1.0).acos()
    } else {
        value.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reject_invalid_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.dcd");
        let mut file = File::create(&path).unwrap();
        file.write_all(&[1, 2, 3, 4]).unwrap();
        let err = DcdFormat::open(&path).unwrap_err();
        match err {
            TrajError::Unsupported(_) | TrajError::Io(_) | TrajError::Parse(_) => {}
            _ => panic!("unexpected error"),
        }
    }

    #[test]
    fn charmm_cell_layout_with_cosines() {
        // [A, cos(gamma), B, cos(beta), cos(alpha), C]
        let box_ = box_from_values(
            [10.0, 0.0, 20.0, 0.0, 0.0, 30.0],
            UnitCellLayout::CharmmAgBcAngles,
        );
        assert_eq!(
            box_,
            Box3::Orthorhombic {
                lx: 10.0,
                ly: 20.0,
                lz: 30.0
            }
        );
    }

    #[test]
    fn standard_cell_layout_with_degrees() {
        let box_ = box_from_values(
            [10.0, 20.0, 30.0, 90.0, 90.0, 90.0],
            UnitCellLayout::StandardAbcAngles,
        );
        assert_eq!(
            box_,
            Box3::Orthorhombic {
                lx: 10.0,
                ly: 20.0,
                lz: 30.0
            }
        );
    }

    #[test]
    fn zero_cell_is_none() {
        let box_ = box_from_values([0.0; 6], UnitCellLayout::StandardAbcAngles);
        assert!(box_.is_none());
    }
}
