//! POD and DMD forecast of one route's monthly accident counts.

use highway_modes::{spatial_dmd, spatial_pod, AnalysisConfig, EventRecord};
use tracing_subscriber::EnvFilter;

fn synthetic_route(region: &str, route: u32) -> Vec<EventRecord> {
    let mut events = Vec::new();
    for year in 2016..2022 {
        for month in 1..=12u32 {
            let angle = month as f64 * std::f64::consts::TAU / 12.0;
            for bin in 0..12u32 {
                let season = (angle + 0.5 * bin as f64).sin();
                // A black spot near km 75 that peaks in the summer months
                let hot = if bin == 7 { 6.0 * (1.0 + season) } else { 0.0 };
                let n = (4.0 + 2.0 * season + hot + (bin % 3) as f64).max(0.0) as u32;
                for k in 0..n {
                    let date = format!("{year:04}-{month:02}-{:02}", 1 + k % 28);
                    let km = bin as f64 * 10.0 + 1.0 + (k % 9) as f64;
                    events.push(
                        EventRecord::from_row(&date, region, route, km, -27.5, -48.6).unwrap(),
                    );
                }
            }
        }
    }
    events
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let events = synthetic_route("SC", 101);
    let config = AnalysisConfig {
        dmd_rank: 4,
        ..Default::default()
    };

    // POD
    let pod = spatial_pod(&events, &config).unwrap();
    println!("POD of BR-{} ({})", config.route, config.region);
    println!(
        "  Matrix: {} bins x {} months, {} events",
        pod.matrix.bin_edges.len(),
        pod.matrix.months.len(),
        pod.total_events
    );
    if let Some(k) = pod.threshold_modes {
        println!(
            "  {} modes hold {:.0}% of the energy",
            k, config.pod_energy_threshold
        );
    }
    if let Some(km) = pod.critical_bin_km {
        println!("  Critical zone: km {:.0}-{:.0}", km, km + config.bin_size_km);
    }

    // DMD
    let report = spatial_dmd(&events, &config).unwrap();
    println!("\nDMD (rank {})", report.dmd.rank);
    println!(
        "  Stable: {}, neutral: {}, unstable: {}",
        report.stability.stable, report.stability.neutral, report.stability.unstable
    );
    println!("  Fit relative error: {:.4}", report.fit.relative_error);

    println!("\nDominant eigenvalues:");
    for e in &report.dominant {
        println!(
            "  |λ|={:.4}, period={:.2} months, {}",
            e.magnitude, e.period, e.stability
        );
    }

    let last = report.forecast.ncols() - 1;
    let totals: Vec<f64> = [report.training_cols - 1, last]
        .iter()
        .map(|&j| (0..report.forecast.nrows()).map(|i| report.forecast[(i, j)]).sum())
        .collect();
    println!(
        "\nForecast: {:.1} events in the last observed month, {:.1} after {} more months",
        totals[0], totals[1], config.forecast_steps
    );
}
