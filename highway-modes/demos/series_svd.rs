//! Sliding-window SVD of a synthetic daily accident series.

use highway_modes::{series_svd, AnalysisConfig, DailySeries};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Three years of counts with a weekly and a yearly cycle, and one bad week
    let start = chrono::NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    let rows: Vec<(String, u64)> = (0..1095u64)
        .map(|d| {
            let t = d as f64;
            let weekly = 8.0 * (t * std::f64::consts::TAU / 7.0).sin();
            let yearly = 5.0 * (t * std::f64::consts::TAU / 365.25).cos();
            let spike = if (600..607).contains(&d) { 25.0 } else { 0.0 };
            let date = start + chrono::Days::new(d);
            (
                date.format("%Y-%m-%d").to_string(),
                (40.0 + weekly + yearly + spike).round() as u64,
            )
        })
        .collect();
    let series = DailySeries::from_rows(&rows).unwrap();

    let config = AnalysisConfig::default();
    let report = series_svd(&series, &config).unwrap();

    println!("Sliding-window SVD");
    println!(
        "  Embedding: {} lags x {} windows",
        report.matrix.nrows(),
        report.matrix.ncols()
    );

    println!("\nEnergy:");
    for (k, (f, c)) in report
        .energy
        .fractions
        .iter()
        .zip(&report.energy.cumulative)
        .take(6)
        .enumerate()
    {
        println!("  Mode {}: {:.2}% (cumulative {:.2}%)", k + 1, f, c);
    }
    match report.threshold_modes {
        Some(k) => println!(
            "  {} modes hold {:.0}% of the energy",
            k, config.series_energy_threshold
        ),
        None => println!("  energy threshold not reached"),
    }

    println!("\nReconstruction error ||X - X_k||_F:");
    for (k, e) in report.error_curve.iter().take(6).enumerate() {
        println!("  k={}: {:.3}", k + 1, e);
    }

    if let Some(j) = report.anomalous_window {
        let first = series.points()[j].date;
        println!(
            "\nMost anomalous window: {} (starting {}), error {:.3}",
            j, first, report.window_errors[j]
        );
    }
}
