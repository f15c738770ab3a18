//! Eigenvalue stability classification relative to the unit circle.

use std::f64::consts::PI;

use tracing::warn;

use crate::types::{EigenInfo, Stability, StabilitySummary, C64};

/// Half-width of the neutral band around |λ| = 1.
pub const NEUTRAL_BAND: f64 = 0.05;

const NEUTRAL_LOWER: f64 = 1.0 - NEUTRAL_BAND;
const NEUTRAL_UPPER: f64 = 1.0 + NEUTRAL_BAND;

/// Classify a magnitude. The neutral band is closed, so magnitudes exactly
/// on either edge are neutral. NaN is treated as growing.
pub fn classify(magnitude: f64) -> Stability {
    if magnitude < NEUTRAL_LOWER {
        Stability::Decaying
    } else if magnitude <= NEUTRAL_UPPER {
        Stability::Neutral
    } else {
        Stability::Growing
    }
}

/// Magnitude, phase, frequency and period of every eigenvalue.
pub fn spectrum(eigenvalues: &[C64]) -> Vec<EigenInfo> {
    eigenvalues
        .iter()
        .enumerate()
        .map(|(index, &lambda)| {
            let magnitude = lambda.norm();
            let phase = lambda.arg();
            let frequency = phase / (2.0 * PI);
            let period = if frequency != 0.0 {
                1.0 / frequency
            } else {
                f64::INFINITY
            };
            EigenInfo {
                index,
                eigenvalue: lambda,
                magnitude,
                phase,
                frequency,
                period,
                stability: classify(magnitude),
            }
        })
        .collect()
}

/// Count decaying, neutral and growing eigenvalues.
pub fn summarize(eigenvalues: &[C64]) -> StabilitySummary {
    let mut summary = StabilitySummary {
        stable: 0,
        neutral: 0,
        unstable: 0,
        max_magnitude: None,
        min_magnitude: None,
    };

    let mut saw_nan = false;
    for lambda in eigenvalues {
        let mag = lambda.norm();
        match classify(mag) {
            Stability::Decaying => summary.stable += 1,
            Stability::Neutral => summary.neutral += 1,
            Stability::Growing => summary.unstable += 1,
        }
        saw_nan |= mag.is_nan();
        summary.max_magnitude = Some(match summary.max_magnitude {
            None => mag,
            Some(m) if m.is_nan() || mag.is_nan() => f64::NAN,
            Some(m) => m.max(mag),
        });
        summary.min_magnitude = Some(match summary.min_magnitude {
            None => mag,
            Some(m) if m.is_nan() || mag.is_nan() => f64::NAN,
            Some(m) => m.min(mag),
        });
    }

    if saw_nan {
        warn!("eigenvalue set contains NaN magnitudes");
    }
    summary
}

/// The `n` eigenvalues of largest magnitude, largest first. Equal
/// magnitudes keep their original order.
pub fn dominant(eigenvalues: &[C64], n: usize) -> Vec<EigenInfo> {
    let mut info = spectrum(eigenvalues);
    info.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
    info.truncate(n);
    info
}
