use nalgebra::Matrix3;

use trajkit_core::error::{TrajError, TrajResult};

use crate::svd::{NalgebraSvd, Svd3};

/// Translates a flat `x0 y0 z0 x1 ...` frame so its centroid sits at the origin.
pub fn center_at_origin(coords: &mut [f64]) {
    let n_atoms = coords.len() / 3;
    if n_atoms == 0 {
        return;
    }
    let mut c = [0.0f64; 3];
    for xyz in coords.chunks_exact(3) {
        c[0] += xyz[0];
        c[1] += xyz[1];
        c[2] += xyz[2];
    }
    for v in c.iter_mut() {
        *v /= n_atoms as f64;
    }
    for xyz in coords.chunks_exact_mut(3) {
        xyz[0] -= c[0];
        xyz[1] -= c[1];
        xyz[2] -= c[2];
    }
}

/// Least-RMSD after optimal superposition of two centered frames.
///
/// The RMSD comes straight from the singular values of the cross-covariance
/// matrix, so no rotation is ever built.
pub struct Superposer {
    backend: Box<dyn Svd3>,
    proper_rotation: bool,
}

impl Default for Superposer {
    fn default() -> Self {
        Self::new(Box::new(NalgebraSvd::default()))
    }
}

impl Superposer {
    pub fn new(backend: Box<dyn Svd3>) -> Self {
        Self {
            backend,
            proper_rotation: false,
        }
    }

    /// Excludes reflections: when `det(R) < 0` the smallest singular value
    /// enters with a negative sign.
    pub fn with_proper_rotation(mut self, enabled: bool) -> Self {
        self.proper_rotation = enabled;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn proper_rotation(&self) -> bool {
        self.proper_rotation
    }

    pub fn rmsd(&self, u: &[f64], v: &[f64]) -> TrajResult<f64> {
        if u.len() != v.len() {
            return Err(TrajError::Mismatch(format!(
                "cannot superpose frames of {} and {} coordinates",
                u.len(),
                v.len()
            )));
        }
        if u.is_empty() || u.len() % 3 != 0 {
            return Err(TrajError::Invalid(format!(
                "frame of {} coordinates is not a set of 3-vectors",
                u.len()
            )));
        }
        let n = (u.len() / 3) as f64;

        let mut e0 = 0.0f64;
        let mut r = Matrix3::<f64>::zeros();
        for (a, b) in u.chunks_exact(3).zip(v.chunks_exact(3)) {
            e0 += a[0] * a[0] + a[1] * a[1] + a[2] * a[2];
            e0 += b[0] * b[0] + b[1] * b[1] + b[2] * b[2];
            for i in 0..3 {
                for j in 0..3 {
                    r[(i, j)] += a[i] * b[j];
                }
            }
        }

        let s = self.backend.singular_values(&r)?;
        let mut ss = s[0] + s[1] + s[2];
        if self.proper_rotation && r.determinant() < 0.0 {
            ss -= 2.0 * s[2];
        }
        Ok(((e0 - 2.0 * ss).abs() / n).sqrt())
    }
}
