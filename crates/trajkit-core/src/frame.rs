use crate::geom::Vec3;

/// Periodic simulation cell attached to a frame.
///
/// Triclinic cells store the three box vectors row-wise (`a`, `b`, `c`),
/// with `a` along x and `b` in the xy plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Box3 {
    None,
    Orthorhombic { lx: f64, ly: f64, lz: f64 },
    Triclinic { m: [f64; 9] },
}

impl Default for Box3 {
    fn default() -> Self {
        Box3::None
    }
}

impl Box3 {
    /// Builds a cell from edge lengths and angles given in radians.
    ///
    /// Degenerate or non-finite parameters yield `Box3::None`.
    pub fn from_lengths_angles(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        let min_len = 1e-6;
        if !a.is_finite()
            || !b.is_finite()
            || !c.is_finite()
            || a <= min_len
            || b <= min_len
            || c <= min_len
        {
            return Box3::None;
        }
        if !alpha.is_finite() || !beta.is_finite() || !gamma.is_finite() {
            return Box3::None;
        }
        let ninety = std::f64::consts::FRAC_PI_2;
        let tol = 1e-3;
        if (alpha - ninety).abs() < tol && (beta - ninety).abs() < tol && (gamma - ninety).abs() < tol
        {
            return Box3::Orthorhombic {
                lx: a,
                ly: b,
                lz: c,
            };
        }

        let cos_alpha = alpha.cos();
        let cos_beta = beta.cos();
        let cos_gamma = gamma.cos();
        let sin_gamma = gamma.sin();
        if sin_gamma.abs() < 1e-8 {
            return Box3::None;
        }
        let bx = b * cos_gamma;
        let by = b * sin_gamma;
        let cx = c * cos_beta;
        let cy = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let cz_sq = c * c - cx * cx - cy * cy;
        if !cz_sq.is_finite() || cz_sq <= 0.0 {
            return Box3::None;
        }
        Box3::Triclinic {
            m: [a, 0.0, 0.0, bx, by, 0.0, cx, cy, cz_sq.sqrt()],
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Box3::None)
    }

    /// Edge lengths of the cell, `None` when no cell is present.
    pub fn lengths(&self) -> Option<Vec3> {
        match *self {
            Box3::None => None,
            Box3::Orthorhombic { lx, ly, lz } => Some(Vec3::new(lx, ly, lz)),
            Box3::Triclinic { m } => {
                let a = Vec3::new(m[0], m[1], m[2]);
                let b = Vec3::new(m[3], m[4], m[5]);
                let c = Vec3::new(m[6], m[7], m[8]);
                Some(Vec3::new(a.norm(), b.norm(), c.norm()))
            }
        }
    }

    pub fn volume(&self) -> Option<f64> {
        match *self {
            Box3::None => None,
            Box3::Orthorhombic { lx, ly, lz } => Some(lx * ly * lz),
            // lower-triangular cell matrix
            Box3::Triclinic { m } => Some((m[0] * m[4] * m[8]).abs()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_angles_give_orthorhombic() {
        let ninety = std::f64::consts::FRAC_PI_2;
        let box_ = Box3::from_lengths_angles(10.0, 20.0, 30.0, ninety, ninety, ninety);
        assert_eq!(
            box_,
            Box3::Orthorhombic {
                lx: 10.0,
                ly: 20.0,
                lz: 30.0
            }
        );
        assert_eq!(box_.volume(), Some(6000.0));
    }

    #[test]
    fn zero_lengths_give_none() {
        let ninety = std::f64::consts::FRAC_PI_2;
        assert!(Box3::from_lengths_angles(0.0, 1.0, 1.0, ninety, ninety, ninety).is_none());
    }

    #[test]
    fn triclinic_keeps_edge_lengths() {
        let sixty = 60f64.to_radians();
        let box_ = Box3::from_lengths_angles(10.0, 10.0, 10.0, sixty, sixty, sixty);
        assert!(matches!(box_, Box3::Triclinic { .. }));
        let l = box_.lengths().unwrap();
        assert!((l.x - 10.0).abs() < 1e-9);
        assert!((l.y - 10.0).abs() < 1e-9);
        assert!((l.z - 10.0).abs() < 1e-9);
    }
}
