use std::io::{self, Write};

use trajkit_core::error::{TrajError, TrajResult};

/// How the cells of a matrix were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixKind {
    /// Frames of one source against each other; each pair is stored twice.
    Pairwise,
    /// Frames of one source against another; every cell is its own pair.
    Cross,
}

/// Dense row-major matrix of RMSD values.
#[derive(Debug, Clone, PartialEq)]
pub struct RmsdMatrix {
    rows: usize,
    cols: usize,
    kind: MatrixKind,
    data: Vec<f64>,
}

impl RmsdMatrix {
    /// Square all-vs-all matrix of `n` frames, zero-filled.
    pub fn pairwise(n: usize) -> Self {
        Self {
            rows: n,
            cols: n,
            kind: MatrixKind::Pairwise,
            data: vec![0.0; n * n],
        }
    }

    pub fn cross(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            kind: MatrixKind::Cross,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Exact symmetry with a zero diagonal.
    pub fn is_symmetric(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        (0..self.rows).all(|i| {
            self.get(i, i) == 0.0 && ((i + 1)..self.cols).all(|j| self.get(i, j) == self.get(j, i))
        })
    }

    /// Writes one line per row, values separated by single spaces.
    pub fn write<W: Write>(&self, out: &mut W, precision: usize) -> io::Result<()> {
        let mut line = String::new();
        for i in 0..self.rows {
            line.clear();
            for (j, value) in self.row(i).iter().enumerate() {
                if j > 0 {
                    line.push(' ');
                }
                line.push_str(&format!("{value:.precision$}"));
            }
            line.push('\n');
            out.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    /// Summary of the distinct comparisons: the strict upper triangle of a
    /// pairwise matrix, every cell of a cross matrix.
    pub fn stats(&self) -> TrajResult<MatrixStats> {
        let values: Vec<f64> = match self.kind {
            MatrixKind::Pairwise => (0..self.rows)
                .flat_map(|i| ((i + 1)..self.cols).map(move |j| (i, j)))
                .map(|(i, j)| self.get(i, j))
                .collect(),
            MatrixKind::Cross => self.data.clone(),
        };
        MatrixStats::from_values(&values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl MatrixStats {
    pub fn from_values(values: &[f64]) -> TrajResult<Self> {
        if values.is_empty() {
            return Err(TrajError::Invalid(
                "no pairwise values to summarize".into(),
            ));
        }
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self {
            count,
            mean,
            std_dev: var.sqrt(),
            min,
            max,
        })
    }
}
