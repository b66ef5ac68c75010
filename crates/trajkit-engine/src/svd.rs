//! Singular values of 3x3 matrices.
//!
//! Backends are stateless and shared across threads by the parallel
//! comparator, hence the `Send + Sync` bound.

use nalgebra::{Matrix3, Vector3};

use trajkit_core::error::{TrajError, TrajResult};

pub trait Svd3: Send + Sync {
    fn name(&self) -> &'static str;

    /// Singular values in descending order.
    fn singular_values(&self, m: &Matrix3<f64>) -> TrajResult<Vector3<f64>>;
}

/// nalgebra's bidiagonalization + implicit QR.
#[derive(Debug, Clone, Copy)]
pub struct NalgebraSvd {
    pub eps: f64,
    pub max_niter: usize,
}

impl Default for NalgebraSvd {
    fn default() -> Self {
        Self {
            eps: f64::EPSILON,
            max_niter: 1000,
        }
    }
}

impl Svd3 for NalgebraSvd {
    fn name(&self) -> &'static str {
        "nalgebra"
    }

    fn singular_values(&self, m: &Matrix3<f64>) -> TrajResult<Vector3<f64>> {
        let svd = m
            .try_svd(false, false, self.eps, self.max_niter)
            .ok_or_else(|| TrajError::Numerical {
                message: "3x3 SVD did not converge".into(),
                info: self.max_niter as i32,
            })?;
        Ok(sorted_desc(svd.singular_values))
    }
}

/// One-sided Jacobi: column pairs are rotated until mutually orthogonal,
/// the column norms are then the singular values.
#[derive(Debug, Clone, Copy)]
pub struct JacobiSvd {
    pub tol: f64,
    pub max_sweeps: usize,
}

impl Default for JacobiSvd {
    fn default() -> Self {
        Self {
            tol: 1e-14,
            max_sweeps: 60,
        }
    }
}

impl Svd3 for JacobiSvd {
    fn name(&self) -> &'static str {
        "jacobi"
    }

    fn singular_values(&self, m: &Matrix3<f64>) -> TrajResult<Vector3<f64>> {
        if m.iter().any(|v| !v.is_finite()) {
            return Err(TrajError::Numerical {
                message: "non-finite value in covariance matrix".into(),
                info: -1,
            });
        }
        let mut a = *m;
        // columns this small are numerically zero and have no direction
        let floor = (f64::EPSILON * f64::EPSILON) * m.norm_squared();
        for _ in 0..self.max_sweeps {
            let mut rotated = false;
            for p in 0..2 {
                for q in (p + 1)..3 {
                    let alpha = a.column(p).norm_squared();
                    let beta = a.column(q).norm_squared();
                    let gamma = a.column(p).dot(&a.column(q));
                    if alpha <= floor
                        || beta <= floor
                        || gamma.abs() <= self.tol * (alpha * beta).sqrt()
                    {
                        continue;
                    }
                    rotated = true;
                    let zeta = (beta - alpha) / (2.0 * gamma);
                    let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                    let c = 1.0 / (1.0 + t * t).sqrt();
                    let s = c * t;
                    for i in 0..3 {
                        let ap = a[(i, p)];
                        let aq = a[(i, q)];
                        a[(i, p)] = c * ap - s * aq;
                        a[(i, q)] = s * ap + c * aq;
                    }
                }
            }
            if !rotated {
                let norms = Vector3::new(a.column(0).norm(), a.column(1).norm(), a.column(2).norm());
                return Ok(sorted_desc(norms));
            }
        }
        Err(TrajError::Numerical {
            message: "Jacobi SVD did not converge".into(),
            info: self.max_sweeps as i32,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvdBackend {
    Nalgebra,
    Jacobi,
}

impl SvdBackend {
    pub fn parse(name: &str) -> TrajResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "nalgebra" => Ok(Self::Nalgebra),
            "jacobi" => Ok(Self::Jacobi),
            other => Err(TrajError::Invalid(format!(
                "unknown SVD backend '{other}' (expected nalgebra or jacobi)"
            ))),
        }
    }

    pub fn build(self) -> Box<dyn Svd3> {
        match self {
            Self::Nalgebra => Box::new(NalgebraSvd::default()),
            Self::Jacobi => Box::new(JacobiSvd::default()),
        }
    }
}

fn sorted_desc(v: Vector3<f64>) -> Vector3<f64> {
    let mut s = [v[0], v[1], v[2]];
    s.sort_by(|a, b| b.total_cmp(a));
    Vector3::new(s[0], s[1], s[2])
}
