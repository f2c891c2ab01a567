//! EstimationModel behaviour: smoothing scenarios, rate onset and properties.
use proptest::prelude::*;
use roast_core::config::ModelCfg;
use roast_core::estimator::{EstimationModel, normalize_ror_window};
use rstest::rstest;

fn model(alpha: f64) -> EstimationModel {
    EstimationModel::new(&ModelCfg {
        alpha,
        ror_window: 9,
    })
    .unwrap()
}

#[test]
fn step_response_matches_closed_form() {
    let mut m = model(0.12);
    m.step(0.0, 150.0);
    let first = m.step(1.0, 200.0);
    assert!((first.estimate - 156.0).abs() < 1e-9);

    for t in 2..=10 {
        m.step(t as f64, 200.0);
    }
    let expected = 200.0 - 50.0 * 0.88f64.powi(10);
    let got = m.estimate().unwrap();
    assert!((got - expected).abs() < 1e-9, "got {got}, want {expected}");
    assert!((got - 174.8).abs() < 0.05);
}

#[test]
fn unsmoothed_rate_from_three_samples() {
    let mut m = model(1.0);
    m.step(0.0, 150.0);
    m.step(1.0, 151.0);
    let e = m.step(2.0, 153.0);
    let want = (153.0 - 150.0) / (2.0 + 1e-6) * 60.0;
    assert!((e.rate - want).abs() < 1e-9);
    assert!((e.rate - 90.0).abs() < 1e-3);
}

#[test]
fn rate_unknown_for_first_two_steps() {
    let mut m = model(0.12);
    assert!(m.step(0.0, 150.0).rate.is_nan());
    assert!(m.step(1.0, 152.0).rate.is_nan());
    assert!(m.step(2.0, 154.0).rate.is_finite());
}

#[test]
fn rate_is_smoothed_once_window_fills() {
    let mut m = model(1.0);
    // Linear ramp of 1 °C/s -> raw rate 60 °C/min everywhere it is defined.
    for i in 0..12 {
        m.step(i as f64, 150.0 + i as f64);
    }
    let rates = m.rates();
    assert_eq!(rates.len(), 12);
    for r in &rates[8..] {
        assert!((r - 60.0).abs() < 1e-3);
    }
}

#[test]
fn non_finite_input_keeps_histories_aligned() {
    let mut m = model(0.5);
    m.step(0.0, 100.0);
    let e = m.step(1.0, f64::NAN);
    assert_eq!(e.estimate, 100.0);
    assert_eq!(m.len(), 2);
    assert_eq!(m.externals().len(), 2);
    assert_eq!(m.estimates().len(), 2);
    assert_eq!(m.rates().len(), 2);
    assert!(m.externals()[1].is_nan());
}

#[test]
fn never_seeded_estimate_is_nan() {
    let mut m = model(0.5);
    let e = m.step(0.0, f64::NAN);
    assert!(e.estimate.is_nan());
    assert_eq!(m.estimate(), None);
}

#[test]
fn backwards_time_is_clamped() {
    let mut m = model(0.5);
    m.step(5.0, 100.0);
    m.step(3.0, 100.0);
    assert_eq!(m.times(), &[5.0, 5.0]);
}

#[test]
fn idle_tracking_does_not_record() {
    let mut m = model(0.5);
    assert_eq!(m.update_idle(100.0), 100.0);
    assert_eq!(m.update_idle(110.0), 105.0);
    assert!(m.is_empty());
}

#[test]
fn reset_keeps_alpha() {
    let mut m = model(0.3);
    m.step(0.0, 100.0);
    m.reset();
    assert!(m.is_empty());
    assert_eq!(m.estimate(), None);
    assert_eq!(m.alpha(), 0.3);
}

#[rstest]
#[case(0.0)]
#[case(-0.1)]
#[case(1.5)]
#[case(f64::NAN)]
fn invalid_alpha_rejected(#[case] alpha: f64) {
    let mut m = model(0.12);
    assert!(m.set_alpha(alpha).is_err());
    assert_eq!(m.alpha(), 0.12);
    assert!(
        EstimationModel::new(&ModelCfg {
            alpha,
            ror_window: 9
        })
        .is_err()
    );
}

#[rstest]
#[case(0, 5)]
#[case(4, 5)]
#[case(6, 7)]
#[case(9, 9)]
#[case(10, 11)]
fn ror_window_normalized(#[case] w: usize, #[case] want: usize) {
    assert_eq!(normalize_ror_window(w), want);
}

proptest! {
    #[test]
    fn estimate_lies_between_previous_and_input(
        seed in -50.0f64..400.0,
        input in -50.0f64..400.0,
        alpha in 0.01f64..=1.0,
    ) {
        let mut m = model(alpha);
        m.step(0.0, seed);
        let prev = m.estimate().unwrap();
        let next = m.step(1.0, input).estimate;
        let (lo, hi) = if prev <= input { (prev, input) } else { (input, prev) };
        prop_assert!(next >= lo - 1e-9 && next <= hi + 1e-9);
    }

    #[test]
    fn constant_input_converges(
        input in 1.0f64..400.0,
        alpha in 0.01f64..=1.0,
        k in 1usize..60,
    ) {
        let mut m = model(alpha);
        for i in 0..k {
            m.step(i as f64, input);
        }
        let err = (m.estimate().unwrap() - input).abs();
        prop_assert!(err <= input * alpha.powi(k as i32) + 1e-9);
    }

    #[test]
    fn offset_decays_geometrically(
        start in 20.0f64..200.0,
        input in 20.0f64..250.0,
        alpha in 0.01f64..=1.0,
        k in 1usize..40,
    ) {
        let mut m = model(alpha);
        m.step(0.0, start);
        for i in 1..=k {
            m.step(i as f64, input);
        }
        let err = (m.estimate().unwrap() - input).abs();
        let bound = (start - input).abs() * (1.0 - alpha).powi(k as i32);
        prop_assert!(err <= bound + 1e-6);
    }
}
