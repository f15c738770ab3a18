//! Proper Orthogonal Decomposition on top of the SVD.
//!
//! Left singular vectors are the spatial (or lag) modes, `diag(S) Vt` the
//! temporal coefficients, and `S²` the modal energy.

use faer::{Mat, MatRef};
use serde::Serialize;
use tracing::{debug, warn};

use crate::snapshot::{center, MeanField};
use crate::svd::decompose;
use crate::types::{ModesError, SvdResult};

/// Energy of each mode as a percentage of the total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergySpectrum {
    /// `S[i]² / ΣS² · 100`, in mode order.
    pub fractions: Vec<f64>,
    /// Running sum of `fractions`.
    pub cumulative: Vec<f64>,
}

impl EnergySpectrum {
    /// Energy percentages from singular values. All-zero spectra yield 0%
    /// for every mode instead of NaN.
    pub fn from_singular_values(s: &[f64]) -> Self {
        let total: f64 = s.iter().map(|v| v * v).sum();
        let fractions: Vec<f64> = if total > 0.0 {
            s.iter().map(|v| v * v / total * 100.0).collect()
        } else {
            if !s.is_empty() {
                warn!(modes = s.len(), "all singular values are zero, reporting 0% energy");
            }
            vec![0.0; s.len()]
        };

        let mut acc = 0.0;
        let cumulative = fractions
            .iter()
            .map(|f| {
                acc += f;
                acc
            })
            .collect();

        Self {
            fractions,
            cumulative,
        }
    }

    /// Smallest 1-indexed mode count whose cumulative energy reaches
    /// `percent`. None if no prefix does (e.g. an all-zero spectrum).
    pub fn modes_for_energy(&self, percent: f64) -> Option<usize> {
        // Rounding can leave the full sum a hair under 100%.
        const SLACK: f64 = 1e-9;
        self.cumulative
            .iter()
            .position(|&c| c >= percent - SLACK)
            .map(|i| i + 1)
    }
}

/// POD of a snapshot matrix.
#[derive(Debug, Clone)]
pub struct PodResult {
    pub svd: SvdResult,
    /// Row means, present when the matrix was centered.
    pub mean: Option<MeanField>,
    pub energy: EnergySpectrum,
}

/// Compute the POD of `x`, centering rows first when `center_rows` is set.
pub fn pod(x: &Mat<f64>, center_rows: bool) -> Result<PodResult, ModesError> {
    let (svd, mean) = if center_rows {
        let (centered, mean) = center(x)?;
        (decompose(&centered, None)?, Some(mean))
    } else {
        (decompose(x, None)?, None)
    };
    let energy = EnergySpectrum::from_singular_values(&svd.s);
    debug!(
        modes = svd.rank(),
        leading_energy = energy.fractions.first().copied().unwrap_or(0.0),
        centered = center_rows,
        "computed POD"
    );
    Ok(PodResult { svd, mean, energy })
}

impl PodResult {
    /// Spatial modes (columns of U).
    pub fn spatial_modes(&self) -> MatRef<'_, f64> {
        self.svd.u.as_ref()
    }

    /// Temporal coefficients with amplitude folded in: `diag(S) Vt`.
    pub fn temporal_coefficients(&self) -> Mat<f64> {
        self.svd.scaled_vt()
    }

    /// Unit-norm temporal coefficients `Vt`, for use alongside `energy`.
    pub fn temporal_modes(&self) -> MatRef<'_, f64> {
        self.svd.vt.as_ref()
    }

    /// Smallest number of modes holding `percent` of the energy.
    pub fn modes_for_energy(&self, percent: f64) -> Option<usize> {
        self.energy.modes_for_energy(percent)
    }

    /// Rank-`k` field in original units (mean restored if centered).
    pub fn rank_reconstruction(&self, k: usize) -> Result<Mat<f64>, ModesError> {
        let mut xk = self.svd.reconstruct(k)?;
        if let Some(mean) = &self.mean {
            mean.restore(&mut xk)?;
        }
        Ok(xk)
    }

    /// Row with the largest absolute loading on `mode`.
    pub fn dominant_row(&self, mode: usize) -> Option<usize> {
        if mode >= self.svd.rank() {
            return None;
        }
        let u = &self.svd.u;
        let mut best: Option<(usize, f64)> = None;
        for i in 0..u.nrows() {
            let v = u[(i, mode)].abs();
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Rows loading positively and negatively on `mode`, each ordered by
    /// decreasing absolute loading. Zero loadings are in neither list.
    pub fn mode_contrast(&self, mode: usize) -> Result<ModeContrast, ModesError> {
        if mode >= self.svd.rank() {
            return Err(ModesError::InvalidParameter(format!(
                "mode {mode} outside 0..{}",
                self.svd.rank()
            )));
        }
        let u = &self.svd.u;
        let mut positive = Vec::new();
        let mut negative = Vec::new();
        for i in 0..u.nrows() {
            let v = u[(i, mode)];
            if v > 0.0 {
                positive.push((i, v));
            } else if v < 0.0 {
                negative.push((i, v));
            }
        }
        positive.sort_by(|a, b| b.1.total_cmp(&a.1));
        negative.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ok(ModeContrast { positive, negative })
    }
}

/// Sign split of a mode's loadings as `(row, loading)` pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeContrast {
    pub positive: Vec<(usize, f64)>,
    pub negative: Vec<(usize, f64)>,
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

    #[test]
    fn test_energy_fractions() {
        let e = EnergySpectrum::from_singular_values(&[3.0, 4.0]);
        assert_near(e.fractions[0], 36.0, 1e-12);
        assert_near(e.fractions[1], 64.0, 1e-12);
        assert_near(e.cumulative[1], 100.0, 1e-12);
    }

    #[test]
    fn test_energy_monotone() {
        let e = EnergySpectrum::from_singular_values(&[10.0, 5.0, 1.0, 0.1, 0.0]);
        for pair in e.cumulative.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_near(*e.cumulative.last().unwrap(), 100.0, 1e-9);
    }

    #[test]
    fn test_modes_for_energy() {
        let e = EnergySpectrum::from_singular_values(&[10.0, 5.0, 1.0, 0.1]);
        // 100 / 126.01 = 79.4%, 125 / 126.01 = 99.2%
        assert_eq!(e.modes_for_energy(50.0), Some(1));
        assert_eq!(e.modes_for_energy(90.0), Some(2));
        assert_eq!(e.modes_for_energy(99.5), Some(3));
        assert_eq!(e.modes_for_energy(100.0), Some(4));
    }

    #[test]
    fn test_zero_energy() {
        let e = EnergySpectrum::from_singular_values(&[0.0, 0.0]);
        assert_eq!(e.fractions, vec![0.0, 0.0]);
        assert_eq!(e.cumulative, vec![0.0, 0.0]);
        assert_eq!(e.modes_for_energy(90.0), None);
    }

    #[test]
    fn test_pod_rank_one_field() {
        // Outer product of a spatial profile and a temporal signal.
        let profile = [1.0, 3.0, 2.0];
        let signal = [1.0, -1.0, 2.0, 0.5];
        let x = Mat::from_fn(3, 4, |i, j| profile[i] * signal[j]);
        let result = pod(&x, false).unwrap();

        assert_near(result.energy.fractions[0], 100.0, 1e-8);
        assert_eq!(result.dominant_row(0), Some(1));
        assert_eq!(result.modes_for_energy(99.0), Some(1));

        let recon = result.rank_reconstruction(1).unwrap();
        for i in 0..3 {
            for j in 0..4 {
                assert_near(recon[(i, j)], x[(i, j)], 1e-10);
            }
        }

        let coeffs = result.temporal_coefficients();
        assert_eq!((coeffs.nrows(), coeffs.ncols()), (3, 4));
    }

    #[test]
    fn test_pod_centered_restores_mean() {
        let x = Mat::from_fn(2, 5, |i, j| 10.0 * (i + 1) as f64 + (j as f64).sin());
        let result = pod(&x, true).unwrap();
        assert!(result.mean.is_some());
        let full = result.rank_reconstruction(result.svd.rank()).unwrap();
        for i in 0..2 {
            for j in 0..5 {
                assert_near(full[(i, j)], x[(i, j)], 1e-10);
            }
        }
    }

    #[test]
    fn test_mode_contrast() {
        let x = Mat::from_fn(3, 4, |i, j| {
            let w = [2.0, -1.0, 0.5][i];
            w * [1.0, 2.0, -1.0, 0.0][j]
        });
        let result = pod(&x, false).unwrap();
        let contrast = result.mode_contrast(0).unwrap();
        assert_eq!(contrast.positive.len() + contrast.negative.len(), 3);
        // Rows 0 and 2 share a sign, row 1 is opposite.
        let pos: Vec<usize> = contrast.positive.iter().map(|(i, _)| *i).collect();
        let neg: Vec<usize> = contrast.negative.iter().map(|(i, _)| *i).collect();
        if pos.contains(&1) {
            assert_eq!(neg, vec![0, 2]);
        } else {
            assert_eq!(pos, vec![0, 2]);
            assert_eq!(neg, vec![1]);
        }
        assert!(result.mode_contrast(3).is_err());
    }
}
