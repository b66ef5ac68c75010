//! Flattened per-frame coordinates of an atom subset.
//!
//! [`CoordinateMatrix`] holds every requested frame in one allocation;
//! [`TrajectoryFrames`] keeps a single frame and goes back to the trajectory
//! for each request. Both are [`FrameSource`]s.

use std::fs;
use std::mem::size_of;

use trajkit_core::error::{TrajError, TrajResult};
use trajkit_core::system::AtomGroup;
use trajkit_io::{Trajectory, TrajectoryFormat};

use crate::superpose::center_at_origin;

/// Random access to centered flat frames.
pub trait FrameSource {
    fn n_frames(&self) -> usize;

    /// Atoms per frame; every frame is `3 * n_atoms()` values.
    fn n_atoms(&self) -> usize;

    fn frame(&mut self, index: usize) -> TrajResult<&[f64]>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateMatrix {
    n_frames: usize,
    n_atoms: usize,
    data: Vec<f64>,
}

impl CoordinateMatrix {
    pub fn zeros(n_frames: usize, n_atoms: usize) -> Self {
        Self {
            n_frames,
            n_atoms,
            data: vec![0.0; n_frames * n_atoms * 3],
        }
    }

    /// Builds a matrix from explicit rows, each `3 * n_atoms` long.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> TrajResult<Self> {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if width % 3 != 0 {
            return Err(TrajError::Invalid(format!(
                "row of {width} values is not a set of 3-vectors"
            )));
        }
        let mut data = Vec::with_capacity(rows.len() * width);
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(TrajError::Mismatch(format!(
                    "row {idx} has {} values, expected {width}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            n_frames: rows.len(),
            n_atoms: width / 3,
            data,
        })
    }

    pub fn stride(&self) -> usize {
        self.n_atoms * 3
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let stride = self.stride();
        &self.data[index * stride..(index + 1) * stride]
    }

    pub fn row_mut(&mut self, index: usize) -> &mut [f64] {
        let stride = self.stride();
        &mut self.data[index * stride..(index + 1) * stride]
    }

    pub fn rows(&self) -> std::slice::ChunksExact<'_, f64> {
        self.data.chunks_exact(self.stride().max(1))
    }

    pub fn center_all(&mut self) {
        let stride = self.stride();
        if stride == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(stride) {
            center_at_origin(row);
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len() * size_of::<f64>()
    }
}

impl FrameSource for CoordinateMatrix {
    fn n_frames(&self) -> usize {
        self.n_frames
    }

    fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    fn frame(&mut self, index: usize) -> TrajResult<&[f64]> {
        if index >= self.n_frames {
            return Err(TrajError::OutOfRange {
                index,
                n_frames: self.n_frames,
            });
        }
        Ok(self.row(index))
    }
}

/// Bytes a [`CoordinateMatrix`] of this shape occupies.
pub fn estimate_cache_bytes(n_frames: usize, n_atoms: usize) -> usize {
    n_frames
        .saturating_mul(n_atoms)
        .saturating_mul(3)
        .saturating_mul(size_of::<f64>())
}

/// Total physical memory, when the platform reports it.
pub fn physical_memory_bytes() -> Option<u64> {
    let meminfo = fs::read_to_string("/proc/meminfo").ok()?;
    parse_mem_total(&meminfo)
}

fn parse_mem_total(meminfo: &str) -> Option<u64> {
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let mut fields = line.split_whitespace().skip(1);
    let value: u64 = fields.next()?.parse().ok()?;
    match fields.next() {
        Some("kB") | None => Some(value * 1024),
        Some(_) => None,
    }
}

/// Reads `frames` of `traj` into a matrix, one row per frame in the order
/// given. Rows hold the subset's coordinates in subset order, uncentered.
pub fn read_coords<F: TrajectoryFormat>(
    traj: &mut Trajectory<F>,
    subset: &AtomGroup,
    frames: &[usize],
) -> TrajResult<CoordinateMatrix> {
    let mut group = subset.clone();
    let mut matrix = CoordinateMatrix::zeros(frames.len(), group.len());
    for (row, &frame) in frames.iter().enumerate() {
        seek_and_update(traj, &mut group, frame)?;
        group.copy_coords_into(matrix.row_mut(row))?;
    }
    log::debug!(
        "cached {} frames x {} atoms ({} bytes)",
        frames.len(),
        group.len(),
        matrix.size_bytes()
    );
    Ok(matrix)
}

/// Uncached frame source: every request seeks the trajectory, extracts the
/// subset and centers it.
pub struct TrajectoryFrames<'a, F: TrajectoryFormat> {
    traj: &'a mut Trajectory<F>,
    group: AtomGroup,
    frames: Vec<usize>,
    buf: Vec<f64>,
    loaded: Option<usize>,
}

impl<'a, F: TrajectoryFormat> TrajectoryFrames<'a, F> {
    pub fn new(traj: &'a mut Trajectory<F>, subset: &AtomGroup, frames: Vec<usize>) -> Self {
        let group = subset.clone();
        let buf = vec![0.0; group.len() * 3];
        Self {
            traj,
            group,
            frames,
            buf,
            loaded: None,
        }
    }
}

impl<F: TrajectoryFormat> FrameSource for TrajectoryFrames<'_, F> {
    fn n_frames(&self) -> usize {
        self.frames.len()
    }

    fn n_atoms(&self) -> usize {
        self.group.len()
    }

    fn frame(&mut self, index: usize) -> TrajResult<&[f64]> {
        if self.loaded == Some(index) {
            return Ok(&self.buf);
        }
        let frame = *self.frames.get(index).ok_or(TrajError::OutOfRange {
            index,
            n_frames: self.frames.len(),
        })?;
        self.loaded = None;
        seek_and_update(self.traj, &mut self.group, frame)?;
        self.group.copy_coords_into(&mut self.buf)?;
        center_at_origin(&mut self.buf);
        self.loaded = Some(index);
        Ok(&self.buf)
    }
}

fn seek_and_update<F: TrajectoryFormat>(
    traj: &mut Trajectory<F>,
    group: &mut AtomGroup,
    frame: usize,
) -> TrajResult<()> {
    if !traj.read_frame_at(frame)? {
        return Err(TrajError::OutOfRange {
            index: frame,
            n_frames: traj.n_frames(),
        });
    }
    traj.update_group_coords(group)
}
