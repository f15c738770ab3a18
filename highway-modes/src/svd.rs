use faer::Mat;
use rayon::prelude::*;
use tracing::debug;

use crate::types::{ModesError, SvdResult};
use crate::utils::{frobenius_diff, validate_matrix};

/// Thin singular value decomposition, optionally truncated to `rank`.
///
/// Returns `U` (rows × r), `S` (r, descending) and `Vt` (r × cols) with
/// `r = min(rows, cols)` unless `rank` is given. Zero singular values are
/// legal output.
pub fn decompose(x: &Mat<f64>, rank: Option<usize>) -> Result<SvdResult, ModesError> {
    validate_matrix(x)?;

    let full_rank = x.nrows().min(x.ncols());
    let r = match rank {
        Some(0) => {
            return Err(ModesError::InvalidParameter(
                "rank must be positive".into(),
            ))
        }
        Some(r) if r > full_rank => {
            return Err(ModesError::InvalidParameter(format!(
                "rank {r} exceeds min(rows, cols) = {full_rank}"
            )))
        }
        Some(r) => r,
        None => full_rank,
    };

    let svd = x
        .thin_svd()
        .map_err(|e| ModesError::Decomposition(format!("{e:?}")))?;
    let u_full = svd.U();
    let v_full = svd.V();
    let s_col = svd.S().column_vector();

    // Order by descending singular value; stable so ties keep backend order.
    let mut order: Vec<usize> = (0..s_col.nrows()).collect();
    order.sort_by(|&a, &b| s_col[b].total_cmp(&s_col[a]));
    order.truncate(r);

    let s: Vec<f64> = order.iter().map(|&k| s_col[k]).collect();
    let u = Mat::from_fn(x.nrows(), r, |i, j| u_full[(i, order[j])]);
    let vt = Mat::from_fn(r, x.ncols(), |i, j| v_full[(j, order[i])]);

    debug!(
        rows = x.nrows(),
        cols = x.ncols(),
        rank = r,
        leading = s.first().copied().unwrap_or(0.0),
        "computed SVD"
    );
    Ok(SvdResult { u, s, vt })
}

impl SvdResult {
    /// Rank-`k` reconstruction `U_k diag(S_k) Vt_k`.
    pub fn reconstruct(&self, k: usize) -> Result<Mat<f64>, ModesError> {
        if k == 0 || k > self.rank() {
            return Err(ModesError::InvalidParameter(format!(
                "reconstruction rank {k} outside 1..={}",
                self.rank()
            )));
        }
        let (rows, cols) = self.data_dim();
        let mut out = Mat::<f64>::zeros(rows, cols);
        for m in 0..k {
            let sm = self.s[m];
            for j in 0..cols {
                let coeff = sm * self.vt[(m, j)];
                for i in 0..rows {
                    out[(i, j)] += self.u[(i, m)] * coeff;
                }
            }
        }
        Ok(out)
    }

    /// Temporal coefficients with the amplitude folded in: `diag(S) Vt`.
    pub fn scaled_vt(&self) -> Mat<f64> {
        Mat::from_fn(self.rank(), self.vt.ncols(), |i, j| self.s[i] * self.vt[(i, j)])
    }
}

/// Frobenius error `‖X − X_k‖_F` for every `k = 1..=r`.
pub fn reconstruction_error_curve(x: &Mat<f64>, svd: &SvdResult) -> Result<Vec<f64>, ModesError> {
    check_shape(x, svd)?;
    (1..=svd.rank())
        .into_par_iter()
        .map(|k| svd.reconstruct(k).map(|xk| frobenius_diff(x, &xk)))
        .collect()
}

/// Euclidean error of each snapshot under the rank-`k` reconstruction.
pub fn column_errors(x: &Mat<f64>, svd: &SvdResult, k: usize) -> Result<Vec<f64>, ModesError> {
    check_shape(x, svd)?;
    let xk = svd.reconstruct(k)?;
    Ok((0..x.ncols())
        .map(|j| {
            (0..x.nrows())
                .map(|i| (x[(i, j)] - xk[(i, j)]).powi(2))
                .sum::<f64>()
                .sqrt()
        })
        .collect())
}

/// Index of the snapshot with the largest error. First index wins ties.
pub fn most_anomalous_column(errors: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (j, &e) in errors.iter().enumerate() {
        match best {
            Some((_, b)) if e <= b => {}
            _ => best = Some((j, e)),
        }
    }
    best.map(|(j, _)| j)
}

fn check_shape(x: &Mat<f64>, svd: &SvdResult) -> Result<(), ModesError> {
    if (x.nrows(), x.ncols()) != svd.data_dim() {
        return Err(ModesError::InvalidParameter(format!(
            "matrix shape ({}, {}) does not match decomposition {:?}",
            x.nrows(),
            x.ncols(),
            svd.data_dim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(a: f64, b: f64, eps: f64) {
        assert!(
            (a - b).abs() < eps,
            "expected {a} ≈ {b} (diff = {})",
            (a - b).abs()
        );
    }

    fn make_matrix() -> Mat<f64> {
        Mat::from_fn(4, 6, |i, j| {
            ((i + 1) as f64 * 0.7 + j as f64 * 0.3).sin() + 0.1 * (i * j) as f64
        })
    }

    #[test]
    fn test_full_reconstruction_identity() {
        let x = make_matrix();
        let svd = decompose(&x, None).unwrap();
        assert_eq!(svd.rank(), 4);
        let recon = svd.reconstruct(4).unwrap();
        let scale = frobenius_diff(&x, &Mat::<f64>::zeros(4, 6));
        assert!(frobenius_diff(&x, &recon) / scale < 1e-8);
    }

    #[test]
    fn test_singular_values_descending() {
        let x = make_matrix();
        let svd = decompose(&x, None).unwrap();
        for pair in svd.s.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        assert!(svd.s.iter().all(|&s| s >= 0.0));
    }

    #[test]
    fn test_orthonormal_factors() {
        let x = make_matrix();
        let svd = decompose(&x, None).unwrap();
        let utu = svd.u.transpose() * &svd.u;
        let v = svd.vt.transpose().to_owned();
        let vvt = &svd.vt * &v;
        for i in 0..svd.rank() {
            for j in 0..svd.rank() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_near(utu[(i, j)], expected, 1e-10);
                assert_near(vvt[(i, j)], expected, 1e-10);
            }
        }
    }

    #[test]
    fn test_truncated_rank() {
        let x = make_matrix();
        let svd = decompose(&x, Some(2)).unwrap();
        assert_eq!(svd.u.ncols(), 2);
        assert_eq!(svd.vt.nrows(), 2);
        assert_eq!(svd.s.len(), 2);
        assert!(matches!(
            decompose(&x, Some(5)),
            Err(ModesError::InvalidParameter(_))
        ));
        assert!(decompose(&x, Some(0)).is_err());
    }

    #[test]
    fn test_zero_matrix_is_legal() {
        let x = Mat::<f64>::zeros(3, 5);
        let svd = decompose(&x, None).unwrap();
        assert!(svd.s.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_error_curve_decreasing_to_zero() {
        let x = make_matrix();
        let svd = decompose(&x, None).unwrap();
        let errors = reconstruction_error_curve(&x, &svd).unwrap();
        assert_eq!(errors.len(), 4);
        for pair in errors.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-10);
        }
        assert_near(errors[3], 0.0, 1e-9);
        // Eckart-Young: rank-1 error is the tail of the spectrum.
        let tail: f64 = svd.s[1..].iter().map(|s| s * s).sum::<f64>().sqrt();
        assert_near(errors[0], tail, 1e-9);
    }

    #[test]
    fn test_column_errors() {
        let x = make_matrix();
        let svd = decompose(&x, None).unwrap();
        let errs = column_errors(&x, &svd, 1).unwrap();
        assert_eq!(errs.len(), 6);
        let total: f64 = errs.iter().map(|e| e * e).sum::<f64>().sqrt();
        let curve = reconstruction_error_curve(&x, &svd).unwrap();
        assert_near(total, curve[0], 1e-9);
    }

    #[test]
    fn test_most_anomalous_column() {
        assert_eq!(most_anomalous_column(&[0.1, 3.0, 2.0, 3.0]), Some(1));
        assert_eq!(most_anomalous_column(&[]), None);
    }
}
