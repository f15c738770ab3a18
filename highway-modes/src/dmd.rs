use faer::Mat;
use tracing::{debug, info};

use crate::predict::step_exponent;
use crate::svd::decompose;
use crate::types::{AmplitudeFit, DmdConfig, DmdResult, ModesError, C64};
use crate::utils::{complex_lstsq, rank_tolerance, validate_matrix};

/// Perform exact Dynamic Mode Decomposition on a snapshot matrix.
///
/// # Arguments
/// * `x` - Data matrix (rows × cols), columns are time-ordered with unit step.
///   Pass a centered matrix to model fluctuations around the mean field.
/// * `config` - Truncation rank and amplitude strategy.
///
/// # Algorithm
/// 1. Split X into X₁ = X[:, 0..n-1] and X₂ = X[:, 1..n]
/// 2. Truncated SVD: X₁ ≈ U Σ Vᵀ
/// 3. Reduced operator: Ã = Uᵀ X₂ V Σ⁻¹
/// 4. Eigendecomposition: Ã W = W Λ
/// 5. DMD modes: Φ = X₂ V Σ⁻¹ W
/// 6. Amplitudes: b = Φ⁺ x₀
///
/// # Errors
/// `InvalidParameter` when `rank` is zero or exceeds `min(rows, cols - 1)`,
/// `SingularMatrix` when one of the retained singular values of X₁ is zero.
pub fn dmd(x: &Mat<f64>, config: &DmdConfig) -> Result<DmdResult, ModesError> {
    validate_matrix(x)?;

    let n_rows = x.nrows();
    let n_time = x.ncols();
    if n_time < 2 {
        return Err(ModesError::InvalidParameter(format!(
            "DMD needs at least 2 snapshots, got {n_time}"
        )));
    }

    let rank = config.rank;
    let max_rank = n_rows.min(n_time - 1);
    if rank == 0 || rank > max_rank {
        return Err(ModesError::InvalidParameter(format!(
            "rank {rank} outside 1..={max_rank} for a ({n_rows}, {n_time}) matrix"
        )));
    }

    // Split into X1 (current) and X2 (next)
    let x1 = x.subcols(0, n_time - 1).to_owned();
    let x2 = x.subcols(1, n_time - 1).to_owned();

    let svd = decompose(&x1, Some(rank))?;
    let s = &svd.s;
    let tol = rank_tolerance(s[0], x1.nrows(), x1.ncols());
    if let Some(j) = s.iter().position(|&sj| sj <= tol) {
        return Err(ModesError::SingularMatrix(format!(
            "singular value {j} of X1 is {:e}; rank {rank} exceeds the numerical rank",
            s[j]
        )));
    }
    let u = &svd.u;
    let v = svd.vt.transpose().to_owned();

    // Reduced DMD matrix: Ã = Uᵀ X₂ V Σ⁻¹
    let ut_x2 = u.transpose() * &x2; // (r × n-1)
    let ut_x2_v = &ut_x2 * &v; // (r × r)

    // Multiply by Σ⁻¹ (scale columns)
    let mut a_tilde = Mat::<f64>::zeros(rank, rank);
    for i in 0..rank {
        for j in 0..rank {
            a_tilde[(i, j)] = ut_x2_v[(i, j)] / s[j];
        }
    }

    // Eigendecomposition of Ã
    let eigen = a_tilde
        .as_ref()
        .eigen()
        .map_err(|e| ModesError::Decomposition(format!("{e:?}")))?;

    let eigenvalues_diag = eigen.S().column_vector();
    let eigenvectors = eigen.U();

    let mut eigenvalues = Vec::with_capacity(rank);
    let mut w_re = Mat::<f64>::zeros(rank, rank);
    let mut w_im = Mat::<f64>::zeros(rank, rank);

    for j in 0..rank {
        let ev = eigenvalues_diag[j];
        eigenvalues.push(C64::new(ev.re, ev.im));
        for i in 0..rank {
            let w = eigenvectors[(i, j)];
            w_re[(i, j)] = w.re;
            w_im[(i, j)] = w.im;
        }
    }

    // DMD modes: Φ = X₂ V Σ⁻¹ W
    let x2_v = &x2 * &v; // (m × r)
    let mut x2_v_sinv = Mat::<f64>::zeros(n_rows, rank);
    for i in 0..n_rows {
        for j in 0..rank {
            x2_v_sinv[(i, j)] = x2_v[(i, j)] / s[j];
        }
    }

    let modes_re = &x2_v_sinv * &w_re;
    let modes_im = &x2_v_sinv * &w_im;

    // Pack into Vec<Vec<C64>> (row-major: modes[i][j] = mode j at row i)
    let modes: Vec<Vec<C64>> = (0..n_rows)
        .map(|i| {
            (0..rank)
                .map(|j| C64::new(modes_re[(i, j)], modes_im[(i, j)]))
                .collect()
        })
        .collect();

    let amplitudes = match config.amplitude_fit {
        AmplitudeFit::FirstSnapshot => {
            let x0: Vec<C64> = (0..n_rows).map(|i| C64::new(x[(i, 0)], 0.0)).collect();
            complex_lstsq(&modes, &x0, rank)?
        }
        AmplitudeFit::LeastSquares => optimal_amplitudes(x, &modes, &eigenvalues)?,
    };

    debug!(
        rank,
        leading_sv = s[0],
        trailing_sv = s[rank - 1],
        "reduced operator eigendecomposed"
    );
    info!(rows = n_rows, cols = n_time, rank, "computed exact DMD");

    Ok(DmdResult {
        modes,
        eigenvalues,
        amplitudes,
        rank,
        svd,
        a_tilde,
        data_dim: (n_rows, n_time),
        amplitude_fit: config.amplitude_fit,
    })
}

/// Amplitudes minimising `‖X − Φ diag(b) V‖_F` over all snapshots, where
/// `V[i][t] = λᵢᵗ` (Jovanović, Schmid & Nichols 2014).
///
/// Solves `P b = q` with `P = (Φᴴ Φ) ∘ conj(V Vᴴ)` and
/// `q = conj(diag(V Xᴴ Φ))`.
fn optimal_amplitudes(
    x: &Mat<f64>,
    modes: &[Vec<C64>],
    eigenvalues: &[C64],
) -> Result<Vec<C64>, ModesError> {
    let n_rows = x.nrows();
    let n_time = x.ncols();
    let rank = eigenvalues.len();

    let last = step_exponent(n_time - 1)?;
    let vand: Vec<Vec<C64>> = eigenvalues
        .iter()
        .map(|lambda| (0..=last).map(|t| lambda.powu(t)).collect())
        .collect();

    // Φᴴ Φ
    let mut gram = vec![vec![C64::new(0.0, 0.0); rank]; rank];
    for i in 0..rank {
        for j in 0..rank {
            let mut val = C64::new(0.0, 0.0);
            for row in modes.iter().take(n_rows) {
                val += row[i].conj() * row[j];
            }
            gram[i][j] = val;
        }
    }

    let mut p = vec![vec![C64::new(0.0, 0.0); rank]; rank];
    for i in 0..rank {
        for j in 0..rank {
            let vv: C64 = (0..n_time).map(|t| vand[i][t] * vand[j][t].conj()).sum();
            p[i][j] = gram[i][j] * vv.conj();
        }
    }

    // (Xᴴ Φ)[t][i] with real X
    let mut q = vec![C64::new(0.0, 0.0); rank];
    for (i, qi) in q.iter_mut().enumerate() {
        let mut acc = C64::new(0.0, 0.0);
        for t in 0..n_time {
            let mut xh_phi = C64::new(0.0, 0.0);
            for (k, row) in modes.iter().enumerate() {
                xh_phi += row[i] * x[(k, t)];
            }
            acc += vand[i][t] * xh_phi;
        }
        *qi = acc.conj();
    }

    complex_lstsq(&p, &q, rank)
}
