use faer::Mat;

use crate::types::{ModesError, C64};

/// Reject empty matrices and matrices holding NaN/Inf.
pub fn validate_matrix(x: &Mat<f64>) -> Result<(), ModesError> {
    let (rows, cols) = (x.nrows(), x.ncols());
    if rows == 0 || cols == 0 {
        return Err(ModesError::EmptyInput(format!(
            "matrix has shape ({rows}, {cols})"
        )));
    }
    for j in 0..cols {
        for i in 0..rows {
            if !x[(i, j)].is_finite() {
                return Err(ModesError::NonFinite(format!(
                    "entry ({i}, {j}) is {}",
                    x[(i, j)]
                )));
            }
        }
    }
    Ok(())
}

/// Default cutoff below which a singular value counts as zero.
pub fn rank_tolerance(max_sv: f64, nrows: usize, ncols: usize) -> f64 {
    max_sv * nrows.max(ncols) as f64 * f64::EPSILON
}

/// Compute the Moore-Penrose pseudo-inverse via SVD.
pub fn pinv(a: &Mat<f64>) -> Result<Mat<f64>, ModesError> {
    let m = a.nrows();
    let n = a.ncols();
    if m == 0 || n == 0 {
        return Ok(Mat::<f64>::zeros(n, m));
    }

    let svd = a
        .thin_svd()
        .map_err(|e| ModesError::Decomposition(format!("{e:?}")))?;
    let u = svd.U();
    let s_col = svd.S().column_vector();
    let v = svd.V();

    let k = s_col.nrows();
    let max_sv = (0..k).map(|i| s_col[i].abs()).fold(0.0_f64, f64::max);
    let tol = rank_tolerance(max_sv, m, n);

    // pinv(A) = V S⁺ Uᵀ
    let mut result = Mat::<f64>::zeros(n, m);
    for idx in 0..k {
        let si = s_col[idx];
        if si.abs() > tol {
            let si_inv = 1.0 / si;
            for j in 0..n {
                for i in 0..m {
                    result[(j, i)] += v[(j, idx)] * si_inv * u[(i, idx)];
                }
            }
        }
    }

    Ok(result)
}

/// Minimum-norm least-squares solution of the complex system `A z ≈ y`.
///
/// `a` is row-major (m × n). The system is realified as
/// `[Re A, -Im A; Im A, Re A] [Re z; Im z] = [Re y; Im y]`, which is an
/// isometry, so the real pseudo-inverse yields exactly `pinv(A) y`.
pub fn complex_lstsq(a: &[Vec<C64>], y: &[C64], n: usize) -> Result<Vec<C64>, ModesError> {
    let m = a.len();
    if y.len() != m {
        return Err(ModesError::InvalidParameter(format!(
            "right-hand side has length {}, expected {m}",
            y.len()
        )));
    }

    let mut real = Mat::<f64>::zeros(2 * m, 2 * n);
    for i in 0..m {
        for j in 0..n {
            let z = a[i][j];
            real[(i, j)] = z.re;
            real[(i, j + n)] = -z.im;
            real[(i + m, j)] = z.im;
            real[(i + m, j + n)] = z.re;
        }
    }

    let real_pinv = pinv(&real)?;

    let mut solution = vec![C64::new(0.0, 0.0); n];
    for (j, out) in solution.iter_mut().enumerate() {
        let mut re = 0.0;
        let mut im = 0.0;
        for i in 0..m {
            re += real_pinv[(j, i)] * y[i].re + real_pinv[(j, i + m)] * y[i].im;
            im += real_pinv[(j + n, i)] * y[i].re + real_pinv[(j + n, i + m)] * y[i].im;
        }
        *out = C64::new(re, im);
    }
    Ok(solution)
}

/// Compute row means of a matrix.
pub fn row_means(x: &Mat<f64>) -> Vec<f64> {
    let (nrows, ncols) = (x.nrows(), x.ncols());
    let mut means = vec![0.0; nrows];
    for (i, mean) in means.iter_mut().enumerate() {
        let mut sum = 0.0;
        for j in 0..ncols {
            sum += x[(i, j)];
        }
        *mean = sum / ncols as f64;
    }
    means
}

/// Frobenius norm of `a - b`. Shapes must match.
pub fn frobenius_diff(a: &Mat<f64>, b: &Mat<f64>) -> f64 {
    let mut sum = 0.0;
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            let d = a[(i, j)] - b[(i, j)];
            sum += d * d;
        }
    }
    sum.sqrt()
}
