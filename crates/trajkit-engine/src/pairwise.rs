use rayon::prelude::*;

use trajkit_core::error::{TrajError, TrajResult};

use crate::cache::{CoordinateMatrix, FrameSource};
use crate::matrix::RmsdMatrix;
use crate::progress::ProgressCounter;
use crate::superpose::Superposer;

/// Distinct unordered pairs among `n_frames`.
pub fn pair_count(n_frames: usize) -> usize {
    n_frames * n_frames.saturating_sub(1) / 2
}

/// All-vs-all RMSD of one source. Only `i < j` is computed; each value is
/// mirrored and the diagonal stays zero.
pub fn pairwise_rmsd<S: FrameSource + ?Sized>(
    source: &mut S,
    superposer: &Superposer,
    progress: &ProgressCounter,
) -> TrajResult<RmsdMatrix> {
    let n = source.n_frames();
    let mut out = RmsdMatrix::pairwise(n);
    for i in 0..n {
        let u = source.frame(i)?.to_vec();
        for j in (i + 1)..n {
            let rmsd = superposer.rmsd(&u, source.frame(j)?)?;
            out.set(i, j, rmsd);
            out.set(j, i, rmsd);
            progress.update();
        }
    }
    Ok(out)
}

/// Every frame of `a` against every frame of `b`; rows follow `a`.
pub fn cross_rmsd<A, B>(
    a: &mut A,
    b: &mut B,
    superposer: &Superposer,
    progress: &ProgressCounter,
) -> TrajResult<RmsdMatrix>
where
    A: FrameSource + ?Sized,
    B: FrameSource + ?Sized,
{
    check_same_atoms(a.n_atoms(), b.n_atoms())?;
    let (rows, cols) = (a.n_frames(), b.n_frames());
    let mut out = RmsdMatrix::cross(rows, cols);
    for i in 0..rows {
        let u = a.frame(i)?.to_vec();
        for j in 0..cols {
            out.set(i, j, superposer.rmsd(&u, b.frame(j)?)?);
            progress.update();
        }
    }
    Ok(out)
}

/// Same values as [`pairwise_rmsd`] on the cached matrix, with rows spread
/// over the current rayon pool. Each task owns its row's upper-triangle
/// cells, so no cell is written twice.
pub fn pairwise_rmsd_parallel(
    cache: &CoordinateMatrix,
    superposer: &Superposer,
    progress: &ProgressCounter,
) -> TrajResult<RmsdMatrix> {
    let n = cache.n_frames();
    let upper: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let u = cache.row(i);
            ((i + 1)..n)
                .map(|j| {
                    let rmsd = superposer.rmsd(u, cache.row(j))?;
                    progress.update();
                    Ok(rmsd)
                })
                .collect::<TrajResult<Vec<f64>>>()
        })
        .collect::<TrajResult<Vec<_>>>()?;

    let mut out = RmsdMatrix::pairwise(n);
    for (i, row) in upper.iter().enumerate() {
        for (k, &rmsd) in row.iter().enumerate() {
            let j = i + 1 + k;
            out.set(i, j, rmsd);
            out.set(j, i, rmsd);
        }
    }
    Ok(out)
}

pub fn cross_rmsd_parallel(
    a: &CoordinateMatrix,
    b: &CoordinateMatrix,
    superposer: &Superposer,
    progress: &ProgressCounter,
) -> TrajResult<RmsdMatrix> {
    check_same_atoms(a.n_atoms(), b.n_atoms())?;
    let (rows, cols) = (a.n_frames(), b.n_frames());
    let values: Vec<Vec<f64>> = (0..rows)
        .into_par_iter()
        .map(|i| {
            let u = a.row(i);
            (0..cols)
                .map(|j| {
                    let rmsd = superposer.rmsd(u, b.row(j))?;
                    progress.update();
                    Ok(rmsd)
                })
                .collect::<TrajResult<Vec<f64>>>()
        })
        .collect::<TrajResult<Vec<_>>>()?;

    let mut out = RmsdMatrix::cross(rows, cols);
    for (i, row) in values.iter().enumerate() {
        for (j, &rmsd) in row.iter().enumerate() {
            out.set(i, j, rmsd);
        }
    }
    Ok(out)
}

fn check_same_atoms(a: usize, b: usize) -> TrajResult<()> {
    if a != b {
        return Err(TrajError::Mismatch(format!(
            "selections differ in size: {a} vs {b} atoms"
        )));
    }
    Ok(())
}
