use criterion::{black_box, criterion_group, criterion_main, Criterion};
use highway_modes::*;

fn make_series(n_days: usize) -> Vec<f64> {
    (0..n_days)
        .map(|d| {
            let t = d as f64;
            30.0 + 6.0 * (t * std::f64::consts::TAU / 7.0).sin()
                + 4.0 * (t * std::f64::consts::TAU / 365.25).cos()
        })
        .collect()
}

fn make_field(n_bins: usize, n_months: usize) -> faer::Mat<f64> {
    faer::Mat::from_fn(n_bins, n_months, |i, j| {
        let t = j as f64 * std::f64::consts::TAU / 12.0;
        let p = i as f64;
        10.0 + (i % 7) as f64
            + 3.0 * (t + 0.2 * p).sin()
            + 0.5 * (2.0 * t + 0.3 * p).cos()
            + 0.8 * (3.0 * t + 0.1 * p).sin()
            + 0.3 * (0.37 * j as f64 + 0.05 * p).cos()
    })
}

fn make_events(n_years: i32) -> Vec<EventRecord> {
    let mut events = Vec::new();
    for year in 0..n_years {
        for month in 1..=12u32 {
            for k in 0..200u32 {
                let date = format!("{:04}-{:02}-{:02}", 2010 + year, month, 1 + k % 28);
                let km = ((k * 37 + month * 11) % 460) as f64 + 0.5;
                events.push(EventRecord::from_row(&date, "SC", 101, km, -27.0, -48.6).unwrap());
            }
        }
    }
    events
}

fn bench_sliding_window_svd(c: &mut Criterion) {
    let mut group = c.benchmark_group("series_svd");

    for &n_days in &[365, 1825, 3650] {
        let series = make_series(n_days);
        let x = sliding_window(&series, 30).unwrap();

        group.bench_function(format!("30x{}", x.ncols()), |b| {
            b.iter(|| decompose(black_box(&x), None).unwrap())
        });
    }

    group.finish();
}

fn bench_dmd(c: &mut Criterion) {
    let mut group = c.benchmark_group("dmd");

    for &(n_bins, n_months) in &[(20, 60), (47, 120), (100, 240)] {
        let (x, _) = center(&make_field(n_bins, n_months)).unwrap();
        let config = DmdConfig {
            rank: 6,
            ..Default::default()
        };

        group.bench_function(format!("{n_bins}x{n_months}"), |b| {
            b.iter(|| dmd(black_box(&x), black_box(&config)).unwrap())
        });
    }

    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let (x, _) = center(&make_field(47, 120)).unwrap();
    let config = DmdConfig {
        rank: 6,
        ..Default::default()
    };
    let result = dmd(&x, &config).unwrap();

    c.bench_function("predict_144", |b| {
        b.iter(|| predict(black_box(&result), black_box(144)).unwrap())
    });
}

fn bench_binning(c: &mut Criterion) {
    let events = make_events(10);

    c.bench_function("spatial_temporal_24k", |b| {
        b.iter(|| spatial_temporal(black_box(&events), black_box(10.0)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_sliding_window_svd,
    bench_dmd,
    bench_predict,
    bench_binning
);
criterion_main!(benches);
