use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use ndarray_linalg::{JobSvd, SVDDC};
use rayon::prelude::*;

use super::error::{LowRankError, Result};
use super::matrix_ops::validate;

/// Reduced singular value decomposition `A = U · diag(σ) · Vᵀ`.
///
/// Factors are sized by `r = min(rows, cols)`. The singular values are kept
/// as a vector and folded into `U` when reconstructing, so `diag(σ)` is never
/// materialized. A `Decomposition` is never mutated after construction.
#[derive(Debug, Clone)]
pub struct Decomposition {
    u: Array2<f64>,
    singular_values: Array1<f64>,
    vt: Array2<f64>,
}

/// Computes the reduced SVD of `matrix`.
pub fn decompose(matrix: &ArrayView2<f64>) -> Result<Decomposition> {
    validate(matrix)?;

    // JobSvd::Some asks LAPACK for the thin factors only: U is m×r, Vt is r×n.
    let (u, singular_values, vt) = matrix.svddc(JobSvd::Some)?;
    let u = u.ok_or(LowRankError::MissingFactor("U"))?;
    let vt = vt.ok_or(LowRankError::MissingFactor("Vt"))?;

    Ok(Decomposition {
        u,
        singular_values,
        vt,
    })
}

pub fn reconstruct(decomposition: &Decomposition, rank: usize) -> Result<Array2<f64>> {
    decomposition.reconstruct(rank)
}

impl Decomposition {
    pub fn u(&self) -> ArrayView2<'_, f64> {
        self.u.view()
    }

    pub fn singular_values(&self) -> ArrayView1<'_, f64> {
        self.singular_values.view()
    }

    pub fn vt(&self) -> ArrayView2<'_, f64> {
        self.vt.view()
    }

    pub fn rank(&self) -> usize {
        self.singular_values.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.u.nrows(), self.vt.ncols())
    }

    fn check_rank(&self, rank: usize) -> Result<()> {
        let max = self.rank();
        if rank == 0 || rank > max {
            return Err(LowRankError::InvalidRank { rank, max });
        }
        Ok(())
    }

    /// `U[:, :k] · diag(σ[:k]) · Vᵀ[:k, :]`.
    pub fn reconstruct(&self, rank: usize) -> Result<Array2<f64>> {
        self.check_rank(rank)?;
        Ok(self.truncated_product(rank))
    }

    fn truncated_product(&self, rank: usize) -> Array2<f64> {
        let scaled = &self.u.slice(s![.., ..rank]) * &self.singular_values.slice(s![..rank]);
        scaled.dot(&self.vt.slice(s![..rank, ..]))
    }

    /// Reconstructs several ranks in parallel, in the order given.
    ///
    /// Every rank is validated before any product is computed.
    pub fn reconstruct_many(&self, ranks: &[usize]) -> Result<Vec<Array2<f64>>> {
        for &rank in ranks {
            self.check_rank(rank)?;
        }
        Ok(ranks
            .par_iter()
            .map(|&rank| self.truncated_product(rank))
            .collect())
    }

    /// Frobenius norm of the rank-`rank` residual, `sqrt(Σ_{i>k} σ_i²)`.
    pub fn residual_norm(&self, rank: usize) -> Result<f64> {
        self.check_rank(rank)?;
        Ok(self.tail_energy(rank).sqrt())
    }

    /// Share of the total squared singular mass kept by the first `rank` values.
    pub fn energy_retained(&self, rank: usize) -> Result<f64> {
        self.check_rank(rank)?;
        let total = self.tail_energy(0);
        if total == 0.0 {
            return Ok(1.0);
        }
        Ok(1.0 - self.tail_energy(rank) / total)
    }

    /// Residual norm for every rank in `1..=r`, indexed from rank 1.
    pub fn error_curve(&self) -> Vec<f64> {
        // Suffix sums from the smallest singular value up keep this O(r).
        let mut tail = 0.0_f64;
        let mut curve = vec![0.0; self.rank()];
        for k in (1..=self.rank()).rev() {
            curve[k - 1] = tail.sqrt();
            let sigma = self.singular_values[k - 1];
            tail += sigma * sigma;
        }
        curve
    }

    /// Scalars needed to store the rank-`rank` factors relative to the original.
    pub fn storage_ratio(&self, rank: usize) -> Result<f64> {
        self.check_rank(rank)?;
        let (m, n) = self.shape();
        Ok((rank * (m + n + 1)) as f64 / (m * n) as f64)
    }

    fn tail_energy(&self, rank: usize) -> f64 {
        self.singular_values
            .slice(s![rank..])
            .iter()
            .map(|s| s * s)
            .sum()
    }
}
