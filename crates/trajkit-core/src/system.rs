use crate::error::{TrajError, TrajResult};
use crate::frame::Box3;
use crate::geom::{center_of_geometry, Vec3};
use crate::selection::Selection;

/// One atom of a model.
///
/// `id` is the 1-based identifier from the structure file; `index` is the
/// 0-based slot of the atom in the model and in every trajectory frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Atom {
    pub id: i32,
    pub index: usize,
    pub name: String,
    pub resname: String,
    pub resid: i32,
    pub chain: String,
    pub segid: String,
    pub coords: Vec3,
}

impl Atom {
    pub fn new(index: usize, name: &str, resname: &str, resid: i32) -> Self {
        Self {
            id: index as i32 + 1,
            index,
            name: name.to_string(),
            resname: resname.to_string(),
            resid,
            chain: String::new(),
            segid: String::new(),
            coords: Vec3::ZERO,
        }
    }

    pub fn with_coords(mut self, coords: Vec3) -> Self {
        self.coords = coords;
        self
    }
}

/// Ordered collection of atoms plus the periodic cell they live in.
#[derive(Clone, Debug, Default)]
pub struct AtomGroup {
    atoms: Vec<Atom>,
    periodic_box: Box3,
}

impl AtomGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_atoms(atoms: Vec<Atom>) -> Self {
        Self {
            atoms,
            periodic_box: Box3::None,
        }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn push(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Atom> {
        self.atoms.iter()
    }

    pub fn get(&self, i: usize) -> Option<&Atom> {
        self.atoms.get(i)
    }

    pub fn periodic_box(&self) -> Box3 {
        self.periodic_box
    }

    pub fn set_periodic_box(&mut self, box_: Box3) {
        self.periodic_box = box_;
    }

    pub fn is_periodic(&self) -> bool {
        !self.periodic_box.is_none()
    }

    pub fn coords(&self) -> Vec<Vec3> {
        self.atoms.iter().map(|a| a.coords).collect()
    }

    /// Writes `x0 y0 z0 x1 y1 z1 ...` into `out`, which must hold `3 * len()` values.
    pub fn copy_coords_into(&self, out: &mut [f64]) -> TrajResult<()> {
        if out.len() != self.atoms.len() * 3 {
            return Err(TrajError::Mismatch(format!(
                "coordinate buffer holds {} values, group needs {}",
                out.len(),
                self.atoms.len() * 3
            )));
        }
        for (dst, atom) in out.chunks_exact_mut(3).zip(self.atoms.iter()) {
            dst[0] = atom.coords.x;
            dst[1] = atom.coords.y;
            dst[2] = atom.coords.z;
        }
        Ok(())
    }

    pub fn centroid(&self) -> Vec3 {
        center_of_geometry(&self.coords())
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounding_box(&self) -> Option<(Vec3, Vec3)> {
        let first = self.atoms.first()?.coords;
        let mut min = first;
        let mut max = first;
        for atom in &self.atoms[1..] {
            let c = atom.coords;
            min = Vec3::new(min.x.min(c.x), min.y.min(c.y), min.z.min(c.z));
            max = Vec3::new(max.x.max(c.x), max.y.max(c.y), max.z.max(c.z));
        }
        Some((min, max))
    }

    /// Subset of atoms matching a keyword selection, in model order.
    pub fn select(&self, expr: &str) -> TrajResult<AtomGroup> {
        let selection = Selection::parse(expr)?;
        let subset = self.filter(|atom| selection.matches(atom));
        if subset.is_empty() {
            return Err(TrajError::InvalidSelection(format!(
                "selection '{expr}' matched no atoms"
            )));
        }
        log::trace!("selection '{expr}' matched {} of {} atoms", subset.len(), self.len());
        Ok(subset)
    }

    pub fn filter<F>(&self, mut pred: F) -> AtomGroup
    where
        F: FnMut(&Atom) -> bool,
    {
        AtomGroup {
            atoms: self.atoms.iter().filter(|a| pred(a)).cloned().collect(),
            periodic_box: self.periodic_box,
        }
    }
}

impl<'a> IntoIterator for &'a AtomGroup {
    type Item = &'a Atom;
    type IntoIter = std::slice::Iter<'a, Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.atoms.iter()
    }
}
