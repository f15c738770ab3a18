use faer::Mat;

use crate::types::{DmdResult, ErrorMetrics, ModesError, C64};

/// Evolve the DMD modes forward from the first training snapshot.
///
/// x(t) = Re( Σᵢ φᵢ · λᵢᵗ · bᵢ ),  t = 0..n_steps
///
/// Column `t` depends only on `t`, so extending the horizon never changes
/// earlier columns. Columns with `t >= data_dim.1` are extrapolation. The
/// result is in the units of the decomposed matrix: if it was centered, the
/// caller adds the mean field back (see [`crate::snapshot::MeanField::restore`]).
pub fn predict(result: &DmdResult, n_steps: usize) -> Result<Mat<f64>, ModesError> {
    if n_steps == 0 {
        return Err(ModesError::InvalidParameter(
            "n_steps must be positive".to_string(),
        ));
    }
    predict_from_parts(&result.modes, &result.eigenvalues, &result.amplitudes, n_steps)
}

/// [`predict`] over raw `(Φ, λ, b)`.
pub fn predict_from_parts(
    modes: &[Vec<C64>],
    eigenvalues: &[C64],
    amplitudes: &[C64],
    n_steps: usize,
) -> Result<Mat<f64>, ModesError> {
    let rank = eigenvalues.len();
    if amplitudes.len() != rank || modes.iter().any(|row| row.len() != rank) {
        return Err(ModesError::InvalidParameter(format!(
            "modes, eigenvalues ({rank}) and amplitudes ({}) disagree on rank",
            amplitudes.len()
        )));
    }

    if n_steps == 0 {
        return Err(ModesError::InvalidParameter(
            "n_steps must be positive".to_string(),
        ));
    }
    let last = step_exponent(n_steps - 1)?;

    let n_rows = modes.len();
    let mut pred = Mat::<f64>::zeros(n_rows, n_steps);
    let mut coeff = vec![C64::new(0.0, 0.0); rank];

    for t in 0..=last {
        for j in 0..rank {
            coeff[j] = eigenvalues[j].powu(t) * amplitudes[j];
        }
        for i in 0..n_rows {
            let mut val = C64::new(0.0, 0.0);
            for j in 0..rank {
                val += modes[i][j] * coeff[j];
            }
            pred[(i, t as usize)] = val.re;
        }
    }

    Ok(pred)
}

/// Time index as an exponent for `λᵗ`.
pub(crate) fn step_exponent(t: usize) -> Result<u32, ModesError> {
    u32::try_from(t).map_err(|_| {
        ModesError::InvalidParameter(format!("time step {t} exceeds the u32 exponent range"))
    })
}

/// Reconstruction over the training span, `predict(result, cols)`.
pub fn reconstruct(result: &DmdResult) -> Result<Mat<f64>, ModesError> {
    predict(result, result.data_dim.1)
}

/// Compare the DMD reconstruction with the matrix it was fitted on.
pub fn fit_error(result: &DmdResult, x: &Mat<f64>) -> Result<ErrorMetrics, ModesError> {
    if (x.nrows(), x.ncols()) != result.data_dim {
        return Err(ModesError::InvalidParameter(format!(
            "matrix shape ({}, {}) does not match DMD data {:?}",
            x.nrows(),
            x.ncols(),
            result.data_dim
        )));
    }
    let n_rows = x.nrows();
    let n_time = x.ncols();
    let recon = reconstruct(result)?;

    let mut sum_sq = 0.0;
    let mut sum_abs = 0.0;
    let mut orig_norm_sq = 0.0;
    let mut per_row_sq = vec![0.0; n_rows];
    let n_total = (n_rows * n_time) as f64;

    for i in 0..n_rows {
        for k in 0..n_time {
            let diff = recon[(i, k)] - x[(i, k)];
            sum_sq += diff * diff;
            sum_abs += diff.abs();
            orig_norm_sq += x[(i, k)] * x[(i, k)];
            per_row_sq[i] += diff * diff;
        }
    }

    let relative_error = if orig_norm_sq > 0.0 {
        (sum_sq / orig_norm_sq).sqrt()
    } else {
        0.0
    };

    Ok(ErrorMetrics {
        rmse: (sum_sq / n_total).sqrt(),
        mae: sum_abs / n_total,
        relative_error,
        per_row_rmse: per_row_sq
            .iter()
            .map(|v| (v / n_time as f64).sqrt())
            .collect(),
    })
}
