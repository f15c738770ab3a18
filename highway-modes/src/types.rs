use faer::Mat;
use serde::{Deserialize, Serialize};

/// Complex scalar used for DMD eigenvalues, modes and amplitudes.
pub type C64 = num_complex::Complex64;

/// Error types for snapshot construction and modal decompositions.
#[derive(Debug, thiserror::Error)]
pub enum ModesError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("singular matrix: {0}")]
    SingularMatrix(String),

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("non-finite input: {0}")]
    NonFinite(String),

    #[error("decomposition failed: {0}")]
    Decomposition(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),
}

/// Thin singular value decomposition `X ≈ U diag(S) Vt`.
#[derive(Debug, Clone)]
pub struct SvdResult {
    /// Left singular vectors (rows × r), orthonormal columns.
    pub u: Mat<f64>,
    /// Singular values (r), non-negative and sorted descending.
    pub s: Vec<f64>,
    /// Right singular vectors transposed (r × cols), orthonormal rows.
    pub vt: Mat<f64>,
}

impl SvdResult {
    /// Number of retained modes.
    pub fn rank(&self) -> usize {
        self.s.len()
    }

    /// Shape of the matrix this decomposition was computed from.
    pub fn data_dim(&self) -> (usize, usize) {
        (self.u.nrows(), self.vt.ncols())
    }
}

/// Strategy for fitting the initial DMD mode amplitudes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmplitudeFit {
    /// `b = pinv(Φ) x₀`, projecting only the first snapshot.
    #[default]
    FirstSnapshot,
    /// Amplitudes minimising `‖X − Φ diag(b) V‖_F` over every snapshot,
    /// where `V` is the Vandermonde matrix of the eigenvalues.
    LeastSquares,
}

/// Configuration for exact DMD.
#[derive(Debug, Clone)]
pub struct DmdConfig {
    /// Truncation rank, at most `min(rows, cols - 1)`.
    pub rank: usize,
    /// How the initial amplitudes are fitted.
    pub amplitude_fit: AmplitudeFit,
}

impl Default for DmdConfig {
    fn default() -> Self {
        Self {
            rank: 10,
            amplitude_fit: AmplitudeFit::FirstSnapshot,
        }
    }
}

/// Result of an exact DMD computation.
#[derive(Debug, Clone)]
pub struct DmdResult {
    /// DMD modes Φ (rows × r), row-major: `modes[i][j]` is mode j at state i.
    pub modes: Vec<Vec<C64>>,
    /// Eigenvalues λ of the reduced operator (r).
    pub eigenvalues: Vec<C64>,
    /// Initial amplitudes b (r).
    pub amplitudes: Vec<C64>,
    /// Truncation rank used.
    pub rank: usize,
    /// Rank-r SVD of X₁.
    pub svd: SvdResult,
    /// Reduced operator Ã = Uᵀ X₂ V Σ⁻¹ (r × r).
    pub a_tilde: Mat<f64>,
    /// Data dimensions (rows, cols) of the decomposed matrix.
    pub data_dim: (usize, usize),
    /// Amplitude strategy that produced `amplitudes`.
    pub amplitude_fit: AmplitudeFit,
}

impl DmdResult {
    /// Number of state rows.
    pub fn n_rows(&self) -> usize {
        self.data_dim.0
    }

    /// Mode column j, or None if `j >= rank`.
    pub fn mode(&self, j: usize) -> Option<Vec<C64>> {
        if j >= self.rank {
            return None;
        }
        Some(self.modes.iter().map(|row| row[j]).collect())
    }
}

/// Stability class of a discrete-time eigenvalue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Decaying,
    Neutral,
    Growing,
}

impl std::fmt::Display for Stability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stability::Decaying => write!(f, "decaying"),
            Stability::Neutral => write!(f, "neutral"),
            Stability::Growing => write!(f, "growing"),
        }
    }
}

/// Derived quantities for a single eigenvalue.
#[derive(Debug, Clone, Serialize)]
pub struct EigenInfo {
    /// Position in the original eigenvalue ordering.
    pub index: usize,
    pub eigenvalue: C64,
    /// |λ|
    pub magnitude: f64,
    /// arg(λ) in radians.
    pub phase: f64,
    /// Cycles per time step, arg(λ) / 2π.
    pub frequency: f64,
    /// 1 / frequency, +∞ for non-oscillating modes.
    pub period: f64,
    pub stability: Stability,
}

/// Partition of an eigenvalue set by magnitude.
#[derive(Debug, Clone, Serialize)]
pub struct StabilitySummary {
    /// |λ| below the neutral band.
    pub stable: usize,
    /// |λ| within the neutral band around the unit circle.
    pub neutral: usize,
    /// |λ| above the neutral band (or NaN).
    pub unstable: usize,
    /// Largest magnitude, None for an empty set. NaN propagates.
    pub max_magnitude: Option<f64>,
    /// Smallest magnitude, None for an empty set. NaN propagates.
    pub min_magnitude: Option<f64>,
}

impl StabilitySummary {
    /// Total number of classified eigenvalues.
    pub fn total(&self) -> usize {
        self.stable + self.neutral + self.unstable
    }
}

/// Error metrics for reconstruction quality.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMetrics {
    /// Root mean square error.
    pub rmse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Relative error (Frobenius norm ratio).
    pub relative_error: f64,
    /// Per-row RMSE.
    pub per_row_rmse: Vec<f64>,
}
