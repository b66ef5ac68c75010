use trajkit_core::error::{TrajError, TrajResult};
use trajkit_core::frame::Box3;
use trajkit_core::geom::Vec3;

use crate::TrajectoryFormat;

/// Trajectory held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryFormat {
    n_atoms: usize,
    frames: Vec<Vec<Vec3>>,
    boxes: Option<Vec<Box3>>,
    timestep: f64,
    next: usize,
    current: Option<usize>,
}

impl MemoryFormat {
    pub fn new(frames: Vec<Vec<Vec3>>) -> TrajResult<Self> {
        let n_atoms = frames
            .first()
            .map(|f| f.len())
            .ok_or_else(|| TrajError::Invalid("in-memory trajectory needs at least one frame".into()))?;
        Self::with_atoms(n_atoms, frames)
    }

    pub fn with_atoms(n_atoms: usize, frames: Vec<Vec<Vec3>>) -> TrajResult<Self> {
        for (idx, frame) in frames.iter().enumerate() {
            if frame.len() != n_atoms {
                return Err(TrajError::Mismatch(format!(
                    "frame {idx} has {} atoms, expected {n_atoms}",
                    frame.len()
                )));
            }
        }
        Ok(Self {
            n_atoms,
            frames,
            boxes: None,
            timestep: 1.0,
            next: 0,
            current: None,
        })
    }

    /// Attaches one periodic cell per frame.
    pub fn with_boxes(mut self, boxes: Vec<Box3>) -> TrajResult<Self> {
        if boxes.len() != self.frames.len() {
            return Err(TrajError::Mismatch(format!(
                "{} boxes for {} frames",
                boxes.len(),
                self.frames.len()
            )));
        }
        self.boxes = Some(boxes);
        Ok(self)
    }

}

impl TrajectoryFormat for MemoryFormat {
    fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    fn timestep(&self) -> f64 {
        self.timestep
    }

    fn n_frames(&self) -> usize {
        self.frames.len()
    }

    fn has_periodic_box(&self) -> bool {
        self.boxes.is_some()
    }

    fn periodic_box(&self) -> Box3 {
        match (&self.boxes, self.current) {
            (Some(boxes), Some(idx)) => boxes[idx],
            _ => Box3::None,
        }
    }

    fn coord(&self, index: usize) -> Option<Vec3> {
        self.current
            .and_then(|frame| self.frames[frame].get(index))
            .copied()
    }

    fn parse_frame(&mut self) -> TrajResult<bool> {
        if self.next >= self.frames.len() {
            return Ok(false);
        }
        self.current = Some(self.next);
        self.next += 1;
        Ok(true)
    }

    fn seek_next_frame(&mut self) -> TrajResult<()> {
        Ok(())
    }

    fn seek_frame(&mut self, index: usize) -> TrajResult<()> {
        if index >= self.frames.len() {
            return Err(TrajError::OutOfRange {
                index,
                n_frames: self.frames.len(),
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
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_frames_are_rejected() {
        let frames = vec![vec![Vec3::ZERO; 2], vec![Vec3::ZERO; 3]];
        assert!(matches!(
            MemoryFormat::new(frames),
            Err(TrajError::Mismatch(_))
        ));
        assert!(MemoryFormat::new(Vec::new()).is_err());
    }

    #[test]
    fn boxes_follow_the_buffered_frame() {
        let frames = vec![vec![Vec3::ZERO], vec![Vec3::ZERO]];
        let boxes = vec![
            Box3::Orthorhombic {
                lx: 1.0,
                ly: 1.0,
                lz: 1.0,
            },
            Box3::Orthorhombic {
                lx: 2.0,
                ly: 2.0,
                lz: 2.0,
            },
        ];
        let mut format = MemoryFormat::new(frames)
            .unwrap()
            .with_boxes(boxes.clone())
            .unwrap();
        assert_eq!(format.periodic_box(), Box3::None);
        format.seek_frame(1).unwrap();
        assert!(format.parse_frame().unwrap());
        assert_eq!(format.periodic_box(), boxes[1]);
        assert!(!format.parse_frame().unwrap());
    }
}
