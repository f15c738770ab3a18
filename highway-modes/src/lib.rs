//! # highway-modes
//!
//! Modal decompositions of highway accident counts.
//!
//! Counts indexed by time (and optionally by position along a route or by
//! region) are arranged into snapshot matrices and analysed with:
//!
//! - **Snapshot builders** ([`sliding_window`], [`spatial_temporal`], [`region_month`]):
//!   time-delay embedding of a daily series, distance × month and region × month
//!   count matrices, row centering with [`MeanField`]
//! - **SVD** ([`decompose`]): sorted thin SVD, rank-k reconstruction, error curves
//!   and per-column anomaly scores
//! - **POD** ([`pod()`]): spatial modes, temporal coefficients and energy spectra
//! - **Exact DMD** ([`dmd()`]): eigenvalues, modes and amplitudes of the best-fit
//!   linear propagator, with forecasting via [`predict()`]
//! - **Stability** ([`summarize`], [`dominant`]): eigenvalue classification
//!   relative to the unit circle
//! - **Pipelines** ([`series_svd`], [`spatial_pod`], [`regional_pod`], [`spatial_dmd`]):
//!   the end-to-end studies driven by an [`AnalysisConfig`]
//!
//! ## Quick Start
//!
//! ```rust
//! use highway_modes::{dmd, predict, sliding_window, DmdConfig};
//!
//! // Daily counts with a weekly cycle
//! let counts: Vec<f64> = (0..90)
//!     .map(|d| 20.0 + 5.0 * (d as f64 * std::f64::consts::TAU / 7.0).sin())
//!     .collect();
//!
//! // Embed into 14-day windows and fit DMD
//! let x = sliding_window(&counts, 14).unwrap();
//! let config = DmdConfig { rank: 3, ..Default::default() };
//! let result = dmd(&x, &config).unwrap();
//!
//! // Training span plus 10 windows ahead
//! let pred = predict(&result, x.ncols() + 10).unwrap();
//! assert_eq!(pred.nrows(), 14);
//! ```
//!
//! ## References
//!
//! - Schmid (2010), *J. Fluid Mech.*, 656, 5-28
//! - Kutz et al. (2016), *Dynamic Mode Decomposition*, SIAM
//! - Jovanović, Schmid & Nichols (2014), *Phys. Fluids*, 26, 024103

pub mod types;

pub mod dmd;
pub mod pipeline;
pub mod pod;
pub mod predict;
pub mod records;
pub mod snapshot;
pub mod stability;
pub mod svd;
pub mod utils;

pub use dmd::dmd;
pub use pipeline::{
    regional_pod, series_svd, spatial_dmd, spatial_dmd_batch, spatial_pod, AnalysisConfig,
    DmdForecastReport, RegionalPodReport, RouteOutcome, SeriesReport, SpatialPodReport,
};
pub use pod::{pod, EnergySpectrum, ModeContrast, PodResult};
pub use predict::{fit_error, predict, predict_from_parts, reconstruct};
pub use records::{filter_route, parse_date, DailyCount, DailySeries, EventRecord, Location, YearMonth};
pub use snapshot::{
    center, region_month, sliding_window, spatial_temporal, MeanField, RegionMatrix,
    SpatialMatrix, MAX_BINNED_CELLS,
};
pub use stability::{classify, dominant, spectrum, summarize, NEUTRAL_BAND};
pub use svd::{column_errors, decompose, most_anomalous_column, reconstruction_error_curve};
pub use types::{
    AmplitudeFit, DmdConfig, DmdResult, EigenInfo, ErrorMetrics, ModesError, Stability,
    StabilitySummary, SvdResult, C64,
};
