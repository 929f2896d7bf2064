use ndarray::{Array2, ArrayView2, Zip};

use super::error::{LowRankError, Result};

/// Builds a matrix from nested rows, rejecting empty and ragged input.
pub fn matrix_from_rows(rows: Vec<Vec<f64>>) -> Result<Array2<f64>> {
    let nrows = rows.len();
    if nrows == 0 {
        return Err(LowRankError::invalid_input("matrix has no rows"));
    }
    let ncols = rows[0].len();
    if ncols == 0 {
        return Err(LowRankError::invalid_input("matrix has no columns"));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
        return Err(LowRankError::invalid_input(format!(
            "row {} has {} columns, expected {}",
            i,
            row.len(),
            ncols
        )));
    }

    let data: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), data)
        .map_err(|e| LowRankError::invalid_input(e.to_string()))
}

pub fn validate(matrix: &ArrayView2<f64>) -> Result<()> {
    let (m, n) = matrix.dim();
    if m == 0 || n == 0 {
        return Err(LowRankError::invalid_input(format!(
            "matrix is empty ({}x{})",
            m, n
        )));
    }
    if let Some(((i, j), v)) = matrix.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(LowRankError::invalid_input(format!(
            "non-finite value {} at ({}, {})",
            v, i, j
        )));
    }
    Ok(())
}

pub fn frobenius_norm(matrix: &ArrayView2<f64>) -> f64 {
    matrix.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Frobenius norm of `a - b`.
pub fn residual_norm(a: &ArrayView2<f64>, b: &ArrayView2<f64>) -> Result<f64> {
    if a.dim() != b.dim() {
        return Err(LowRankError::ShapeMismatch {
            left: a.dim(),
            right: b.dim(),
        });
    }
    let sum = Zip::from(a)
        .and(b)
        .fold(0.0_f64, |acc, &x, &y| acc + (x - y) * (x - y));
    Ok(sum.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn from_rows_builds_row_major() {
        let m = matrix_from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(m.dim(), (2, 3));
        assert_eq!(m[[1, 0]], 4.0);
        assert_eq!(m[[0, 2]], 3.0);
    }

    #[test]
    fn from_rows_rejects_ragged() {
        let err = matrix_from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, LowRankError::InvalidInput { .. }));
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn from_rows_rejects_empty() {
        assert!(matches!(
            matrix_from_rows(vec![]),
            Err(LowRankError::InvalidInput { .. })
        ));
        assert!(matches!(
            matrix_from_rows(vec![vec![], vec![]]),
            Err(LowRankError::InvalidInput { .. })
        ));
    }

    #[test]
    fn validate_rejects_non_finite() {
        let nan = array![[1.0, f64::NAN]];
        let inf = array![[f64::NEG_INFINITY], [0.0]];
        assert!(validate(&nan.view()).is_err());
        assert!(validate(&inf.view()).is_err());
        assert!(validate(&array![[0.0, -1.5]].view()).is_ok());
    }

    #[test]
    fn validate_rejects_zero_sized() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            validate(&empty.view()),
            Err(LowRankError::InvalidInput { .. })
        ));
    }

    #[test]
    fn norms() {
        let a = array![[3.0, 0.0], [0.0, 4.0]];
        let b = array![[3.0, 1.0], [1.0, 4.0]];
        assert_abs_diff_eq!(frobenius_norm(&a.view()), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            residual_norm(&a.view(), &b.view()).unwrap(),
            2f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn residual_norm_checks_shape() {
        let a = Array2::<f64>::zeros((2, 2));
        let b = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            residual_norm(&a.view(), &b.view()),
            Err(LowRankError::ShapeMismatch { .. })
        ));
    }
}
