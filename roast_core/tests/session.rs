//! Session orchestration: run state, commands, clock handling and persistence.
use roast_core::{
    Advice, Controls, EventLabel, RorTarget, RunState, SensorSnapshot, SensorStatus, Session,
};

fn snap(v: f64, t: f64) -> Option<SensorSnapshot> {
    Some(SensorSnapshot {
        raw_value: v,
        is_valid: true,
        last_update_s: t,
        source_label: "test",
    })
}

/// Ramp of `rate` °C/s starting at `start`, one tick per `dt`.
fn drive(s: &mut Session, n: usize, dt: f64, start: f64, rate: f64) {
    let t0 = s.last_tick_s().map_or(0.0, |t| t + dt);
    for i in 0..n {
        let t = t0 + i as f64 * dt;
        s.tick(t, snap(start + rate * (t - t0), t));
    }
}

#[test]
fn clock_regression_is_rejected() {
    let mut s = Session::builder().try_build().unwrap();
    s.start();
    s.tick(1.0, snap(150.0, 1.0));
    let r = s.tick(0.5, snap(151.0, 0.5));
    assert!(r.rejected);
    assert_eq!(r.sample_count, 1);
    assert_eq!(s.model().times(), &[1.0]);
    assert_eq!(s.last_tick_s(), Some(1.0));

    let r = s.tick(f64::NAN, snap(151.0, 1.5));
    assert!(r.rejected);
    assert_eq!(s.samples().len(), 1);
}

#[test]
fn equal_tick_times_are_accepted() {
    let mut s = Session::builder().try_build().unwrap();
    s.start();
    s.tick(1.0, snap(150.0, 1.0));
    assert!(!s.tick(1.0, snap(150.0, 1.0)).rejected);
    assert_eq!(s.samples().len(), 2);
}

#[test]
fn stale_reading_is_late_and_holds() {
    let mut s = Session::builder().try_build().unwrap();
    s.start();
    s.tick(0.0, snap(150.0, 0.0));
    let r = s.tick(5.0, snap(150.0, 0.0));
    assert_eq!(r.sensor_status, SensorStatus::Late);
    assert_eq!(r.et_c, None);
    assert_eq!(r.estimate_c, Some(150.0));
}

#[test]
fn report_fields_after_a_ramp() {
    let mut s = Session::builder().try_build().unwrap();
    s.start();
    drive(&mut s, 60, 0.5, 150.0, 0.5);
    let r = s.tick(30.0, snap(165.0, 30.0));
    assert_eq!(r.state, RunState::Running);
    assert_eq!(r.sensor_status, SensorStatus::Ok);
    assert_eq!(r.sample_count, 61);
    let rate = r.rate_c_per_min.unwrap();
    assert!(rate > 0.0);
    assert!(r.eta_to_first_crack_s.unwrap() > 0.0);
    assert!(r.eta_to_drop_s.unwrap() > r.eta_to_first_crack_s.unwrap());
    assert!(r.ai_predicted_remaining_s.is_some());
    assert_eq!(r.ror_target, 7.0);
    assert_eq!(r.advisory, roast_core::advisor::suggest(rate, 7.0, 0.4));
    assert_ne!(r.advisory, Advice::Unavailable);
}

#[test]
fn mark_event_uses_last_tick_and_estimate() {
    let mut s = Session::builder().try_build().unwrap();
    // Before any tick: time 0, no temperature.
    let ev = s.mark_event(EventLabel::Charge);
    assert_eq!(ev.time_sec, 0.0);
    assert!(ev.temp_c.is_nan());

    s.start();
    s.tick(0.0, snap(180.0, 0.0));
    s.tick(12.5, snap(180.0, 12.5));
    let ev = s.mark_event(EventLabel::TurningPoint);
    assert_eq!(ev.time_sec, 12.5);
    assert_eq!(ev.temp_c, 180.0);
    assert_eq!(s.events().len(), 2);
}

#[test]
fn first_crack_commits_the_predictor() {
    let mut s = Session::builder().try_build().unwrap();
    s.start();
    drive(&mut s, 40, 0.5, 170.0, 0.4);
    let t = s.last_tick_s().unwrap();
    s.mark_event(EventLabel::FirstCrack);
    let p = s.last_prediction().unwrap();
    assert_eq!(p.at_s, t);
    assert_eq!(p.remaining_s, 0.0);
}

#[test]
fn reset_clears_logs_and_model() {
    let mut s = Session::builder().try_build().unwrap();
    s.set_controls(Controls {
        gas: 8,
        air: 2,
        setpoint_c: 220,
    });
    s.start();
    drive(&mut s, 10, 0.5, 150.0, 1.0);
    s.mark_event(EventLabel::Charge);
    s.reset();

    assert_eq!(s.state(), RunState::Idle);
    assert!(s.samples().is_empty());
    assert!(s.events().is_empty());
    assert!(s.model().is_empty());
    assert_eq!(s.model().estimate(), None);
    assert_eq!(s.last_tick_s(), None);
    assert_eq!(s.last_prediction(), None);
    // Operator settings survive.
    assert_eq!(s.controls().gas, 8);

    // Time base restarts.
    assert!(!s.tick(0.0, snap(20.0, 0.0)).rejected);
}

#[test]
fn stop_pauses_recording() {
    let mut s = Session::builder().try_build().unwrap();
    s.start();
    drive(&mut s, 5, 0.5, 150.0, 1.0);
    s.stop();
    let r = s.tick(10.0, snap(170.0, 10.0));
    assert_eq!(r.state, RunState::Idle);
    assert_eq!(r.sample_count, 5);
    assert_eq!(r.rate_c_per_min, None);
    assert_eq!(r.advisory, Advice::Unavailable);
}

#[test]
fn commands_validate_input() {
    let mut s = Session::builder().try_build().unwrap();
    assert!(s.set_alpha(0.0).is_err());
    assert!(s.set_alpha(0.5).is_ok());
    assert_eq!(s.model().alpha(), 0.5);

    assert!(s.set_calibration(1.0, 0.0).is_err());
    assert!(s.set_calibration(-2.0, 101.0).is_ok());
    assert_eq!(s.calibration().offset_c, -2.0);

    assert!(s.set_milestone_targets(200.0, 190.0).is_err());
    assert!(s.set_milestone_targets(f64::NAN, 190.0).is_err());
    assert!(s.set_milestone_targets(198.0, 208.0).is_ok());
    assert_eq!(s.targets().drop_c, 208.0);
}

#[test]
fn calibration_applies_to_readings() {
    let mut s = Session::builder().try_build().unwrap();
    s.set_calibration(5.0, 110.0).unwrap();
    let r = s.tick(0.0, snap(100.0, 0.0));
    assert!((r.et_c.unwrap() - 115.0).abs() < 1e-9);
}

#[test]
fn profile_sets_alpha_targets_and_ror_curve() {
    let mut s = Session::builder().try_build().unwrap();
    let profile = roast_config::Profile {
        alpha: 0.2,
        first_crack_bt: 194.0,
        drop_bt: 210.0,
        ror_curve: Some(vec![
            roast_config::ProfilePoint { t: 0.0, v: 12.0 },
            roast_config::ProfilePoint { t: 600.0, v: 4.0 },
        ]),
        ..roast_config::Profile::default()
    };
    s.apply_profile(&profile).unwrap();
    assert_eq!(s.model().alpha(), 0.2);
    assert_eq!(s.targets().first_crack_c, 194.0);
    assert_eq!(s.targets().drop_c, 210.0);
    assert!(matches!(s.ror_target(), RorTarget::Curve(_)));
    let r = s.tick(300.0, snap(150.0, 300.0));
    assert!((r.ror_target - 8.0).abs() < 1e-9);

    let bad = roast_config::Profile {
        alpha: 2.0,
        ..roast_config::Profile::default()
    };
    assert!(s.apply_profile(&bad).is_err());
    assert_eq!(s.model().alpha(), 0.2);
}

#[test]
fn export_then_import_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("roast");

    let mut s = Session::builder().try_build().unwrap();
    s.start();
    s.mark_event(EventLabel::Charge);
    drive(&mut s, 30, 0.5, 150.0, 0.7);
    s.tick(15.0, None);
    s.mark_event(EventLabel::DryEnd);
    let paths = s.export(&base).unwrap();
    assert!(paths.combined.exists());
    assert!(paths.samples.exists());
    assert!(paths.events.exists());
    assert!(paths.meta.exists());

    let meta = roast_config::session::load_meta_json(&paths.meta).unwrap();
    assert_eq!(meta.events_count, 2);
    assert_eq!(meta.scale_pct, 100.0);

    for path in [&paths.combined, &paths.samples] {
        let mut back = Session::builder().try_build().unwrap();
        let n = back.import(path).unwrap();
        assert_eq!(n, s.samples().len());

        for (a, b) in s.samples().iter().zip(back.samples()) {
            assert!((a.time_sec - b.time_sec).abs() <= 0.005);
            for (x, y) in [
                (a.external_temp_c, b.external_temp_c),
                (a.estimated_temp_c, b.estimated_temp_c),
            ] {
                assert_eq!(x.is_nan(), y.is_nan());
                if x.is_finite() {
                    assert!((x - y).abs() <= 0.005);
                }
            }
            assert_eq!(a.rate_c_per_min.is_nan(), b.rate_c_per_min.is_nan());
            if a.rate_c_per_min.is_finite() {
                assert!((a.rate_c_per_min - b.rate_c_per_min).abs() <= 0.0005);
            }
            assert_eq!(a.control_gas, b.control_gas);
        }

        let labels: Vec<_> = back.events().iter().map(|e| e.label).collect();
        assert_eq!(labels, vec![EventLabel::Charge, EventLabel::DryEnd]);
        assert_eq!(back.events()[1].time_sec, 15.0);
    }
}

#[test]
fn projections_need_history() {
    let mut s = Session::builder().try_build().unwrap();
    assert!(s.project_bt().is_none());
    s.start();
    drive(&mut s, 20, 0.5, 150.0, 0.5);
    assert!(s.project_bt().is_some());
    assert!(s.project_et().is_some());
}

#[test]
fn ticks_before_an_imported_log_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("late");

    let mut s = Session::builder().try_build().unwrap();
    s.start();
    for i in 0..10 {
        let t = 100.0 + f64::from(i);
        s.tick(t, snap(150.0 + f64::from(i), t));
    }
    let paths = s.export(&base).unwrap();

    let mut back = Session::builder().try_build().unwrap();
    back.import(&paths.combined).unwrap();
    assert_eq!(back.last_tick_s(), Some(109.0));
    back.start();
    let r = back.tick(0.0, snap(150.0, 0.0));
    assert!(r.rejected);
    assert_eq!(back.samples().len(), 10);

    assert!(!back.tick(110.0, snap(160.0, 110.0)).rejected);
    let times: Vec<f64> = back.samples().iter().map(|s| s.time_sec).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]), "{times:?}");
    assert_eq!(times.last(), Some(&110.0));
}

#[test]
fn dropout_keeps_a_gap_in_the_et_history() {
    let mut s = Session::builder().try_build().unwrap();
    s.start();
    s.tick(0.0, snap(150.0, 0.0));
    s.tick(0.5, snap(150.0, 0.5));
    let r = s.tick(1.0, None);
    assert_eq!(r.estimate_c, Some(150.0));
    assert_eq!(r.et_c, None);

    let ext = s.model().externals();
    assert_eq!(ext.len(), 3);
    assert_eq!(&ext[..2], &[150.0, 150.0]);
    assert!(ext[2].is_nan());
    assert_eq!(s.model().estimates()[2], 150.0);
    assert!(s.samples()[2].external_temp_c.is_nan());
}

#[test]
fn milestone_targets_must_be_plausible_temperatures() {
    let mut s = Session::builder().try_build().unwrap();
    assert!(s.set_milestone_targets(1e17, 2e17).is_err());
    assert!(s.set_milestone_targets(196.0, 400.0).is_err());
    assert!(s.set_milestone_targets(-50.0, 205.0).is_err());
    assert_eq!(s.targets().first_crack_c, 196.0);
    assert!(s.set_milestone_targets(200.0, 350.0).is_ok());
}
