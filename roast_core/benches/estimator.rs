use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use roast_core::config::{ForecastCfg, ModelCfg};
use roast_core::estimator::EstimationModel;
use roast_core::forecast::Forecaster;
use roast_core::{SensorSnapshot, Session};

// Roast-like ET trace with a small deterministic ripple.
fn synth_trace(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64 * 0.5;
            220.0 - 200.0 * (-t / 300.0).exp() + 0.4 * (t * 1.7).sin()
        })
        .collect()
}

fn bench_estimator(c: &mut Criterion) {
    let trace = synth_trace(1800);

    c.bench_function("estimator_step_1800", |b| {
        b.iter_batched(
            || EstimationModel::new(&ModelCfg::default()).unwrap(),
            |mut m| {
                for (i, v) in trace.iter().enumerate() {
                    black_box(m.step(i as f64 * 0.5, *v));
                }
                m
            },
            BatchSize::SmallInput,
        )
    });

    let mut m = EstimationModel::new(&ModelCfg::default()).unwrap();
    for (i, v) in trace.iter().enumerate() {
        m.step(i as f64 * 0.5, *v);
    }
    let fc = Forecaster::new(ForecastCfg::default());
    c.bench_function("forecast_eta", |b| {
        b.iter(|| black_box(fc.eta_seconds(m.times(), m.estimates(), black_box(196.0))))
    });
}

fn bench_session_tick(c: &mut Criterion) {
    let trace = synth_trace(600);
    let template = Session::builder().try_build().unwrap();

    c.bench_function("session_tick_600", |b| {
        b.iter_batched(
            || {
                let mut s = template.clone();
                s.start();
                s
            },
            |mut s| {
                for (i, v) in trace.iter().enumerate() {
                    let t = i as f64 * 0.5;
                    let snap = SensorSnapshot {
                        raw_value: *v,
                        is_valid: true,
                        last_update_s: t,
                        source_label: "bench",
                    };
                    black_box(s.tick(t, Some(snap)));
                }
                s
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_estimator, bench_session_tick);
criterion_main!(benches);
