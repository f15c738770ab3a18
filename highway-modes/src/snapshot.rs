//! Snapshot matrix construction.
//!
//! Every builder returns a dense `faer::Mat<f64>` (column-major) whose columns
//! are snapshots in increasing time order and whose rows follow a strictly
//! increasing structural coordinate: lag index, distance bin or region code.

use std::collections::{BTreeMap, BTreeSet};

use faer::Mat;
use serde::Serialize;
use tracing::debug;

use crate::records::{EventRecord, YearMonth};
use crate::types::ModesError;
use crate::utils::row_means;

/// Build a time-delay (Hankel) embedding of a scalar series.
///
/// The result has shape `(window_size, N - window_size + 1)` and column `k`
/// is `x[k..k + window_size]`. Neighbouring columns share `window_size - 1`
/// entries, so columns are not independent samples.
///
/// Memory is `8 · window_size · (N - window_size + 1)` bytes for the matrix,
/// roughly tripled once the thin SVD factors exist. A 30-day window over
/// 20 000 days stays below 15 MB.
///
/// Binned matrices from [`spatial_temporal`] are capped at
/// [`MAX_BINNED_CELLS`] entries (400 MB of `f64`); a finer bin size is
/// rejected before anything is allocated.
pub fn sliding_window(x: &[f64], window_size: usize) -> Result<Mat<f64>, ModesError> {
    let n = x.len();
    if n == 0 {
        return Err(ModesError::EmptyInput("series has no values".into()));
    }
    if window_size == 0 {
        return Err(ModesError::InvalidParameter(
            "window_size must be positive".into(),
        ));
    }
    if window_size > n {
        return Err(ModesError::InvalidParameter(format!(
            "window_size ({window_size}) exceeds series length ({n})"
        )));
    }

    let n_cols = n - window_size + 1;
    let h = Mat::from_fn(window_size, n_cols, |i, k| x[k + i]);
    debug!(rows = window_size, cols = n_cols, "built sliding-window embedding");
    Ok(h)
}

/// Upper bound on `bins × months` for [`spatial_temporal`].
pub const MAX_BINNED_CELLS: usize = 50_000_000;

/// Distance × month count matrix for one route.
#[derive(Debug, Clone)]
pub struct SpatialMatrix {
    /// Event counts (bins × months).
    pub matrix: Mat<f64>,
    /// Lower edge of each distance bin, increasing.
    pub bin_edges: Vec<f64>,
    /// Month of each column, increasing and contiguous.
    pub months: Vec<YearMonth>,
}

/// Cross-tabulate located events into half-open distance bins and months.
///
/// Bins are `[k·bin_size, (k+1)·bin_size)` for `k = 0..=floor(max / bin_size)`,
/// so the span is `[0, max_position + bin_size)`. Months run contiguously from
/// the first to the last event month. Empty cells are zero. Events without a
/// location are skipped.
pub fn spatial_temporal(events: &[EventRecord], bin_size: f64) -> Result<SpatialMatrix, ModesError> {
    if !(bin_size.is_finite() && bin_size > 0.0) {
        return Err(ModesError::InvalidParameter(format!(
            "bin_size must be positive, got {bin_size}"
        )));
    }

    let located: Vec<(f64, YearMonth)> = events
        .iter()
        .filter_map(|e| e.location.map(|loc| (loc.position_km, e.month())))
        .collect();
    if located.is_empty() {
        return Err(ModesError::EmptyInput("no located events".into()));
    }

    let mut max_position = 0.0_f64;
    for &(pos, _) in &located {
        if !(pos.is_finite() && pos >= 0.0) {
            return Err(ModesError::InvalidParameter(format!(
                "position must be a non-negative finite distance, got {pos}"
            )));
        }
        max_position = max_position.max(pos);
    }

    let first = located.iter().map(|(_, m)| *m).min().unwrap_or(located[0].1);
    let last = located.iter().map(|(_, m)| *m).max().unwrap_or(located[0].1);
    let months = YearMonth::range_inclusive(first, last);

    let span = (max_position / bin_size).floor();
    let n_bins = if span < MAX_BINNED_CELLS as f64 {
        span as usize + 1
    } else {
        usize::MAX
    };
    if n_bins.saturating_mul(months.len()) > MAX_BINNED_CELLS {
        return Err(ModesError::InvalidParameter(format!(
            "bin_size {bin_size} over {max_position} km and {} months exceeds {MAX_BINNED_CELLS} cells",
            months.len()
        )));
    }
    let bin_edges: Vec<f64> = (0..n_bins).map(|k| k as f64 * bin_size).collect();

    let mut matrix = Mat::<f64>::zeros(n_bins, months.len());
    for &(pos, month) in &located {
        let bin = ((pos / bin_size).floor() as usize).min(n_bins - 1);
        let col = first.months_until(month) as usize;
        matrix[(bin, col)] += 1.0;
    }

    debug!(
        events = located.len(),
        bins = n_bins,
        months = months.len(),
        "built spatial-temporal matrix"
    );
    Ok(SpatialMatrix {
        matrix,
        bin_edges,
        months,
    })
}

/// Region × month count matrix.
#[derive(Debug, Clone)]
pub struct RegionMatrix {
    /// Event counts (regions × months).
    pub matrix: Mat<f64>,
    /// Region codes in ascending order.
    pub regions: Vec<String>,
    /// Month of each column, increasing and contiguous.
    pub months: Vec<YearMonth>,
}

/// Count events per region and calendar month. Events without a region are
/// skipped.
pub fn region_month(events: &[EventRecord]) -> Result<RegionMatrix, ModesError> {
    let mut counts: BTreeMap<(&str, YearMonth), f64> = BTreeMap::new();
    let mut regions: BTreeSet<&str> = BTreeSet::new();
    for e in events {
        if let Some(region) = e.region.as_deref() {
            *counts.entry((region, e.month())).or_insert(0.0) += 1.0;
            regions.insert(region);
        }
    }
    if regions.is_empty() {
        return Err(ModesError::EmptyInput("no events with a region".into()));
    }

    let first = counts.keys().map(|(_, m)| *m).min();
    let last = counts.keys().map(|(_, m)| *m).max();
    let (first, last) = match (first, last) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err(ModesError::EmptyInput("no months observed".into())),
    };
    let months = YearMonth::range_inclusive(first, last);
    let row_of: BTreeMap<&str, usize> = regions
        .iter()
        .enumerate()
        .map(|(i, region)| (*region, i))
        .collect();

    let mut matrix = Mat::<f64>::zeros(row_of.len(), months.len());
    for (&(region, month), &count) in &counts {
        matrix[(row_of[region], first.months_until(month) as usize)] = count;
    }

    debug!(
        regions = regions.len(),
        months = months.len(),
        "built region-month matrix"
    );
    Ok(RegionMatrix {
        matrix,
        regions: regions.into_iter().map(String::from).collect(),
        months,
    })
}

/// Per-row temporal mean removed by [`center`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanField {
    pub means: Vec<f64>,
}

impl MeanField {
    /// Add the mean back to every column of `x`.
    pub fn restore(&self, x: &mut Mat<f64>) -> Result<(), ModesError> {
        if x.nrows() != self.means.len() {
            return Err(ModesError::InvalidParameter(format!(
                "matrix has {} rows, mean field has {}",
                x.nrows(),
                self.means.len()
            )));
        }
        for j in 0..x.ncols() {
            for (i, m) in self.means.iter().enumerate() {
                x[(i, j)] += m;
            }
        }
        Ok(())
    }
}

/// Subtract each row's mean across all columns.
pub fn center(x: &Mat<f64>) -> Result<(Mat<f64>, MeanField), ModesError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ModesError::EmptyInput(format!(
            "cannot center a ({}, {}) matrix",
            x.nrows(),
            x.ncols()
        )));
    }
    let means = row_means(x);
    let centered = Mat::from_fn(x.nrows(), x.ncols(), |i, j| x[(i, j)] - means[i]);
    Ok((centered, MeanField { means }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::parse_date;

    fn assert_near(a: f64, b: f64, eps: f64) {
        assert!(
            (a - b).abs() < eps,
            "expected {a} ≈ {b} (diff = {})",
            (a - b).abs()
        );
    }

    fn event(date: &str, region: &str, km: f64) -> EventRecord {
        EventRecord::from_row(date, region, 101, km, -27.0, -48.5).unwrap()
    }

    #[test]
    fn test_sliding_window_shape_and_overlap() {
        let x: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let h = sliding_window(&x, 3).unwrap();
        assert_eq!((h.nrows(), h.ncols()), (3, 8));
        for i in 0..3 {
            assert_eq!(h[(i, 0)], x[i]);
            assert_eq!(h[(i, 7)], x[7 + i]);
        }
        for k in 0..7 {
            for i in 0..2 {
                assert_eq!(h[(i + 1, k)], h[(i, k + 1)]);
            }
        }
    }

    #[test]
    fn test_sliding_window_full_length() {
        let x = [4.0, 5.0, 6.0];
        let h = sliding_window(&x, 3).unwrap();
        assert_eq!((h.nrows(), h.ncols()), (3, 1));
    }

    #[test]
    fn test_sliding_window_too_large() {
        let x = [1.0, 2.0];
        assert!(matches!(
            sliding_window(&x, 3),
            Err(ModesError::InvalidParameter(_))
        ));
        assert!(matches!(
            sliding_window(&[], 1),
            Err(ModesError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_spatial_temporal_counts() {
        let events = vec![
            event("2020-01-05", "SC", 0.0),
            event("2020-01-20", "SC", 9.9),
            event("2020-03-02", "SC", 10.0),
            event("2020-03-15", "SC", 25.0),
        ];
        let sm = spatial_temporal(&events, 10.0).unwrap();
        assert_eq!(sm.bin_edges, vec![0.0, 10.0, 20.0]);
        let labels: Vec<String> = sm.months.iter().map(|m| m.to_string()).collect();
        assert_eq!(labels, ["2020-01", "2020-02", "2020-03"]);

        assert_eq!(sm.matrix[(0, 0)], 2.0);
        assert_eq!(sm.matrix[(1, 2)], 1.0);
        assert_eq!(sm.matrix[(2, 2)], 1.0);
        // February had no events but is still a column.
        for bin in 0..3 {
            assert_eq!(sm.matrix[(bin, 1)], 0.0);
        }
    }

    #[test]
    fn test_spatial_temporal_max_on_edge() {
        let events = vec![event("2021-06-01", "SC", 20.0)];
        let sm = spatial_temporal(&events, 10.0).unwrap();
        assert_eq!(sm.bin_edges.len(), 3);
        assert_eq!(sm.matrix[(2, 0)], 1.0);
    }

    #[test]
    fn test_spatial_temporal_rejects_bad_input() {
        let events = vec![event("2021-06-01", "SC", 5.0)];
        assert!(spatial_temporal(&events, 0.0).is_err());
        assert!(matches!(
            spatial_temporal(&[], 10.0),
            Err(ModesError::EmptyInput(_))
        ));
        let negative = vec![event("2021-06-01", "SC", -1.0)];
        assert!(spatial_temporal(&negative, 10.0).is_err());
    }

    #[test]
    fn test_region_month() {
        let events = vec![
            event("2020-01-01", "SP", 1.0),
            event("2020-01-09", "SC", 1.0),
            event("2020-03-01", "SC", 1.0),
            event("2020-03-02", "SC", 1.0),
            EventRecord {
                date: parse_date("2020-02-01").unwrap(),
                region: None,
                location: None,
                latitude: None,
                longitude: None,
            },
        ];
        let rm = region_month(&events).unwrap();
        assert_eq!(rm.regions, vec!["SC".to_string(), "SP".to_string()]);
        assert_eq!(rm.months.len(), 3);
        assert_eq!(rm.matrix[(0, 0)], 1.0);
        assert_eq!(rm.matrix[(0, 1)], 0.0);
        assert_eq!(rm.matrix[(0, 2)], 2.0);
        assert_eq!(rm.matrix[(1, 0)], 1.0);
        assert_eq!(rm.matrix[(1, 2)], 0.0);
    }

    #[test]
    fn test_center_and_restore() {
        let mut x = Mat::<f64>::zeros(2, 3);
        x[(0, 0)] = 1.0;
        x[(0, 1)] = 2.0;
        x[(0, 2)] = 3.0;
        x[(1, 0)] = 5.0;
        x[(1, 1)] = 5.0;
        x[(1, 2)] = 5.0;

        let (mut c, mean) = center(&x).unwrap();
        assert_near(mean.means[0], 2.0, 1e-12);
        assert_near(mean.means[1], 5.0, 1e-12);
        for j in 0..3 {
            assert_near(c[(1, j)], 0.0, 1e-12);
        }

        mean.restore(&mut c).unwrap();
        for i in 0..2 {
            for j in 0..3 {
                assert_near(c[(i, j)], x[(i, j)], 1e-12);
            }
        }
    }
}
