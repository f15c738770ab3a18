//! End-to-end analyses over the accident inputs.
//!
//! Each entry point builds its own snapshot matrix and decomposition from an
//! explicit [`AnalysisConfig`]; nothing is shared between runs.

use faer::Mat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::dmd::dmd;
use crate::pod::{pod, EnergySpectrum, ModeContrast, PodResult};
use crate::predict::{fit_error, predict};
use crate::records::{filter_route, DailySeries, EventRecord};
use crate::snapshot::{
    center, region_month, sliding_window, spatial_temporal, MeanField, RegionMatrix,
    SpatialMatrix,
};
use crate::stability::{dominant, summarize};
use crate::svd::{column_errors, decompose, most_anomalous_column, reconstruction_error_curve};
use crate::types::{
    AmplitudeFit, DmdConfig, DmdResult, EigenInfo, ErrorMetrics, ModesError, StabilitySummary,
    SvdResult,
};

/// Parameters of an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Region code selecting the route study.
    pub region: String,
    /// Route number selecting the route study.
    pub route: u32,
    /// Width of the distance bins in km.
    pub bin_size_km: f64,
    /// Sliding-window length (days) for the daily series.
    pub window_size: usize,
    /// DMD truncation rank.
    pub dmd_rank: usize,
    /// Steps to forecast past the training span.
    pub forecast_steps: usize,
    /// Energy percentage reported for POD studies.
    pub pod_energy_threshold: f64,
    /// Energy percentage used to reconstruct the daily series.
    pub series_energy_threshold: f64,
    /// Subtract row means before POD and DMD.
    pub center: bool,
    /// Number of eigenvalues in the dominant-mode report.
    pub top_eigenvalues: usize,
    pub amplitude_fit: AmplitudeFit,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            region: "SC".to_string(),
            route: 101,
            bin_size_km: 10.0,
            window_size: 30,
            dmd_rank: 15,
            forecast_steps: 24,
            pod_energy_threshold: 90.0,
            series_energy_threshold: 95.0,
            center: true,
            top_eigenvalues: 5,
            amplitude_fit: AmplitudeFit::FirstSnapshot,
        }
    }
}

impl AnalysisConfig {
    /// Reject parameter values no analysis can use.
    pub fn validate(&self) -> Result<(), ModesError> {
        if !(self.bin_size_km.is_finite() && self.bin_size_km > 0.0) {
            return Err(ModesError::InvalidParameter(format!(
                "bin_size_km must be positive, got {}",
                self.bin_size_km
            )));
        }
        if self.window_size == 0 {
            return Err(ModesError::InvalidParameter(
                "window_size must be positive".into(),
            ));
        }
        if self.dmd_rank == 0 {
            return Err(ModesError::InvalidParameter(
                "dmd_rank must be positive".into(),
            ));
        }
        for (name, pct) in [
            ("pod_energy_threshold", self.pod_energy_threshold),
            ("series_energy_threshold", self.series_energy_threshold),
        ] {
            if !(pct > 0.0 && pct <= 100.0) {
                return Err(ModesError::InvalidParameter(format!(
                    "{name} must be in (0, 100], got {pct}"
                )));
            }
        }
        Ok(())
    }

    fn dmd_config(&self) -> DmdConfig {
        DmdConfig {
            rank: self.dmd_rank,
            amplitude_fit: self.amplitude_fit,
        }
    }
}

/// SVD of the time-delay embedded daily series.
#[derive(Debug, Clone)]
pub struct SeriesReport {
    /// Embedding (window_size × windows).
    pub matrix: Mat<f64>,
    pub svd: SvdResult,
    pub energy: EnergySpectrum,
    /// Modes reaching `series_energy_threshold`.
    pub threshold_modes: Option<usize>,
    /// `‖X − X_k‖_F` for k = 1..=r.
    pub error_curve: Vec<f64>,
    /// Per-window error at `threshold_modes` (empty when the threshold is
    /// never reached).
    pub window_errors: Vec<f64>,
    pub central_window: usize,
    pub anomalous_window: Option<usize>,
}

/// Embed the daily series and decompose it.
pub fn series_svd(series: &DailySeries, config: &AnalysisConfig) -> Result<SeriesReport, ModesError> {
    config.validate()?;
    let _span = info_span!("series_svd", window = config.window_size).entered();

    let matrix = sliding_window(&series.values(), config.window_size)?;
    let svd = decompose(&matrix, None)?;
    let energy = EnergySpectrum::from_singular_values(&svd.s);
    let threshold_modes = energy.modes_for_energy(config.series_energy_threshold);
    let error_curve = reconstruction_error_curve(&matrix, &svd)?;

    let window_errors = match threshold_modes {
        Some(k) => column_errors(&matrix, &svd, k)?,
        None => Vec::new(),
    };
    let anomalous_window = most_anomalous_column(&window_errors);
    let central_window = matrix.ncols() / 2;

    info!(
        days = series.len(),
        windows = matrix.ncols(),
        threshold_modes = ?threshold_modes,
        anomalous_window = ?anomalous_window,
        "series SVD complete"
    );
    Ok(SeriesReport {
        matrix,
        svd,
        energy,
        threshold_modes,
        error_curve,
        window_errors,
        central_window,
        anomalous_window,
    })
}

/// POD of one route's distance × month matrix.
#[derive(Debug, Clone)]
pub struct SpatialPodReport {
    pub matrix: SpatialMatrix,
    pub pod: PodResult,
    /// Modes reaching `pod_energy_threshold`.
    pub threshold_modes: Option<usize>,
    /// Lower edge of the bin with the largest loading on the first mode.
    pub critical_bin_km: Option<f64>,
    pub total_events: f64,
}

/// Bin the configured route's events and compute their POD.
pub fn spatial_pod(
    events: &[EventRecord],
    config: &AnalysisConfig,
) -> Result<SpatialPodReport, ModesError> {
    config.validate()?;
    let _span = info_span!("spatial_pod", region = %config.region, route = config.route).entered();

    let route_events = filter_route(events, &config.region, config.route);
    let matrix = spatial_temporal(&route_events, config.bin_size_km)?;
    let pod = pod(&matrix.matrix, config.center)?;
    let threshold_modes = pod.modes_for_energy(config.pod_energy_threshold);
    let critical_bin_km = pod.dominant_row(0).map(|i| matrix.bin_edges[i]);

    info!(
        events = route_events.len(),
        bins = matrix.bin_edges.len(),
        months = matrix.months.len(),
        threshold_modes = ?threshold_modes,
        "spatial POD complete"
    );
    Ok(SpatialPodReport {
        total_events: route_events.len() as f64,
        matrix,
        pod,
        threshold_modes,
        critical_bin_km,
    })
}

/// POD of the region × month matrix.
#[derive(Debug, Clone)]
pub struct RegionalPodReport {
    pub matrix: RegionMatrix,
    pub pod: PodResult,
    pub threshold_modes: Option<usize>,
    /// Sign split of the second mode, when there is one.
    pub contrast: Option<ModeContrast>,
    pub total_events: f64,
}

/// Count events per region and month and compute their POD.
pub fn regional_pod(
    events: &[EventRecord],
    config: &AnalysisConfig,
) -> Result<RegionalPodReport, ModesError> {
    config.validate()?;
    let _span = info_span!("regional_pod").entered();

    let matrix = region_month(events)?;
    let pod = pod(&matrix.matrix, config.center)?;
    let threshold_modes = pod.modes_for_energy(config.pod_energy_threshold);
    let contrast = if pod.svd.rank() > 1 {
        Some(pod.mode_contrast(1)?)
    } else {
        None
    };
    let total_events = (0..matrix.matrix.ncols())
        .flat_map(|j| (0..matrix.matrix.nrows()).map(move |i| (i, j)))
        .map(|(i, j)| matrix.matrix[(i, j)])
        .sum();

    info!(
        regions = matrix.regions.len(),
        months = matrix.months.len(),
        threshold_modes = ?threshold_modes,
        "regional POD complete"
    );
    Ok(RegionalPodReport {
        matrix,
        pod,
        threshold_modes,
        contrast,
        total_events,
    })
}

/// DMD fit and forecast of one route.
#[derive(Debug, Clone)]
pub struct DmdForecastReport {
    pub matrix: SpatialMatrix,
    /// Mean field removed before the fit, if centering was on.
    pub mean: Option<MeanField>,
    pub dmd: DmdResult,
    pub stability: StabilitySummary,
    /// Largest-magnitude eigenvalues, `top_eigenvalues` of them.
    pub dominant: Vec<EigenInfo>,
    /// Training span followed by `forecast_steps` columns, original units.
    pub forecast: Mat<f64>,
    /// Number of observed months; forecast columns from here on are future.
    pub training_cols: usize,
    /// Reconstruction error over the training span, in fitted units.
    pub fit: ErrorMetrics,
}

/// Fit DMD to the configured route and forecast `forecast_steps` months.
pub fn spatial_dmd(
    events: &[EventRecord],
    config: &AnalysisConfig,
) -> Result<DmdForecastReport, ModesError> {
    config.validate()?;
    let _span = info_span!("spatial_dmd", region = %config.region, route = config.route).entered();

    let route_events = filter_route(events, &config.region, config.route);
    let matrix = spatial_temporal(&route_events, config.bin_size_km)?;

    let (work, mean) = if config.center {
        let (centered, mean) = center(&matrix.matrix)?;
        (centered, Some(mean))
    } else {
        (matrix.matrix.clone(), None)
    };

    let result = dmd(&work, &config.dmd_config())?;
    let stability = summarize(&result.eigenvalues);
    let dominant = dominant(&result.eigenvalues, config.top_eigenvalues);
    let fit = fit_error(&result, &work)?;

    let training_cols = work.ncols();
    let mut forecast = predict(&result, training_cols + config.forecast_steps)?;
    if let Some(mean) = &mean {
        mean.restore(&mut forecast)?;
    }

    info!(
        rank = result.rank,
        stable = stability.stable,
        neutral = stability.neutral,
        unstable = stability.unstable,
        horizon = forecast.ncols(),
        "DMD forecast complete"
    );
    Ok(DmdForecastReport {
        matrix,
        mean,
        dmd: result,
        stability,
        dominant,
        forecast,
        training_cols,
        fit,
    })
}

/// Outcome of one route in a batch run.
pub type RouteOutcome = ((String, u32), Result<DmdForecastReport, ModesError>);

/// Run [`spatial_dmd`] for several `(region, route)` pairs in parallel.
/// Each run owns its own matrix and decomposition.
pub fn spatial_dmd_batch(
    events: &[EventRecord],
    routes: &[(String, u32)],
    config: &AnalysisConfig,
) -> Vec<RouteOutcome> {
    routes
        .par_iter()
        .map(|(region, route)| {
            let cfg = AnalysisConfig {
                region: region.clone(),
                route: *route,
                ..config.clone()
            };
            ((region.clone(), *route), spatial_dmd(events, &cfg))
        })
        .collect()
}
