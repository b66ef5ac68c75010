use trajkit_core::error::{TrajError, TrajResult};
use trajkit_core::frame::Box3;
use trajkit_core::geom::Vec3;
use trajkit_core::system::AtomGroup;

use crate::TrajectoryFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajState {
    /// Frame 0 is buffered and has not been handed out yet.
    Initialized,
    Iterating,
    Exhausted,
}

/// Frame cursor over any [`TrajectoryFormat`].
///
/// Construction always leaves frame 0 buffered and unconsumed, so the first
/// [`read_frame`](Self::read_frame) yields frame 0 without touching the
/// stream. A trajectory is driven by a single owner; nothing here is shared.
pub struct Trajectory<F: TrajectoryFormat = Box<dyn TrajectoryFormat>> {
    format: F,
    cached_first: bool,
    cursor: usize,
    current: usize,
    state: TrajState,
}

impl<F: TrajectoryFormat> Trajectory<F> {
    pub fn new(mut format: F) -> TrajResult<Self> {
        if !format.parse_frame()? {
            return Err(TrajError::Parse(format!(
                "{} trajectory contains no frames",
                format.format_name()
            )));
        }
        Ok(Self {
            format,
            cached_first: true,
            cursor: 0,
            current: 0,
            state: TrajState::Initialized,
        })
    }

    pub fn n_atoms(&self) -> usize {
        self.format.n_atoms()
    }

    pub fn timestep(&self) -> f64 {
        self.format.timestep()
    }

    pub fn n_frames(&self) -> usize {
        self.format.n_frames()
    }

    pub fn has_periodic_box(&self) -> bool {
        self.format.has_periodic_box()
    }

    /// Cell of the buffered frame.
    pub fn periodic_box(&self) -> Box3 {
        self.format.periodic_box()
    }

    pub fn state(&self) -> TrajState {
        self.state
    }

    /// Index of the buffered frame.
    pub fn current_frame(&self) -> usize {
        self.current
    }

    pub fn format_name(&self) -> &'static str {
        self.format.format_name()
    }

    /// Advances to the next frame. `Ok(false)` at end of stream, and on
    /// every call after that.
    pub fn read_frame(&mut self) -> TrajResult<bool> {
        if self.cached_first {
            self.consume_cached_first();
            return Ok(true);
        }
        if self.state == TrajState::Exhausted {
            return Ok(false);
        }
        if self.cursor >= self.format.n_frames() {
            self.state = TrajState::Exhausted;
            return Ok(false);
        }
        self.format.seek_next_frame()?;
        if !self.format.parse_frame()? {
            self.state = TrajState::Exhausted;
            return Ok(false);
        }
        self.current = self.cursor;
        self.cursor += 1;
        self.state = TrajState::Iterating;
        Ok(true)
    }

    /// Buffers frame `index`; a following [`read_frame`](Self::read_frame)
    /// continues with `index + 1`. `Ok(false)` when `index` is out of range.
    pub fn read_frame_at(&mut self, index: usize) -> TrajResult<bool> {
        if index >= self.format.n_frames() {
            return Ok(false);
        }
        if index == 0 && self.cached_first {
            self.consume_cached_first();
            return Ok(true);
        }
        self.cached_first = false;
        self.format.seek_frame(index)?;
        if !self.format.parse_frame()? {
            self.state = TrajState::Exhausted;
            return Ok(false);
        }
        self.current = index;
        self.cursor = index + 1;
        self.state = TrajState::Iterating;
        Ok(true)
    }

    /// Returns to frame 0 and re-buffers it, as right after construction.
    pub fn rewind(&mut self) -> TrajResult<()> {
        self.format.rewind()?;
        if !self.format.parse_frame()? {
            return Err(TrajError::Parse(format!(
                "{} trajectory lost its first frame on rewind",
                self.format.format_name()
            )));
        }
        self.cached_first = true;
        self.cursor = 0;
        self.current = 0;
        self.state = TrajState::Initialized;
        Ok(())
    }

    /// Buffered frame as coordinates. Formats that store axes separately
    /// (DCD) pay an interleaving pass here.
    pub fn coords(&self) -> Vec<Vec3> {
        self.format.coords()
    }

    /// Copies the buffered frame into `group`, addressing by atom index.
    pub fn update_group_coords(&self, group: &mut AtomGroup) -> TrajResult<()> {
        let n_atoms = self.format.n_atoms();
        for atom in group.atoms_mut() {
            atom.coords = self.format.coord(atom.index).ok_or_else(|| {
                TrajError::Mismatch(format!(
                    "atom id {} (index {}) is beyond a frame of {n_atoms} atoms",
                    atom.id, atom.index
                ))
            })?;
        }
        if self.format.has_periodic_box() {
            group.set_periodic_box(self.format.periodic_box());
        }
        Ok(())
    }

    fn consume_cached_first(&mut self) {
        self.cached_first = false;
        self.current = 0;
        self.cursor = 1;
        self.state = TrajState::Iterating;
    }
}
