//! Sampler thread lifecycle and snapshot publishing.
//!
//! Verifies that:
//! - Threads are properly cleaned up when Sampler is dropped
//! - Failed reads publish invalid snapshots instead of stopping the thread
//! - `latest()` keeps returning the newest snapshot once the channel is drained

use roast_core::sampler::Sampler;
use roast_hardware::{ScriptedProbe, SimulatedProbe};
use roast_traits::clock::MonotonicClock;
use std::time::{Duration, Instant};

fn wait_for<F: FnMut() -> bool>(mut f: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn sampler_thread_exits_on_drop() {
    let clock = MonotonicClock::new();
    let probe = SimulatedProbe::new(clock);
    let sampler = Sampler::spawn(probe, 20.0, Duration::from_millis(100), clock).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    // Drop joins the thread; the test hangs if it leaked.
    drop(sampler);
}

#[test]
fn multiple_samplers_dont_leak_threads() {
    let clock = MonotonicClock::new();
    for _ in 0..10 {
        let probe = SimulatedProbe::new(clock);
        let mut sampler = Sampler::spawn(probe, 100.0, Duration::from_millis(50), clock).unwrap();
        std::thread::sleep(Duration::from_millis(10));
        let _ = sampler.latest();
        drop(sampler);
    }
}

#[test]
fn publishes_valid_snapshots() {
    let clock = MonotonicClock::new();
    let probe = ScriptedProbe::from_values(vec![21.5; 1000]);
    let mut sampler = Sampler::spawn(probe, 200.0, Duration::from_millis(10), clock).unwrap();
    assert!(wait_for(|| sampler.latest().is_some()));
    let s = sampler.latest().unwrap();
    assert!(s.is_valid);
    assert_eq!(s.raw_value, 21.5);
    assert_eq!(s.source_label, "scripted");
    assert!(s.last_update_s >= 0.0);
}

#[test]
fn failed_reads_publish_invalid_snapshots() {
    let clock = MonotonicClock::new();
    // Two good readings, then the script is exhausted and every read fails.
    let probe = ScriptedProbe::from_values([150.0, 151.0]);
    let mut sampler = Sampler::spawn(probe, 200.0, Duration::from_millis(10), clock).unwrap();
    assert!(wait_for(|| sampler.latest().is_some_and(|s| !s.is_valid)));
    let s = sampler.latest().unwrap();
    assert!(s.raw_value.is_nan());
}

#[test]
fn latest_is_cached_between_drains() {
    let clock = MonotonicClock::new();
    let probe = ScriptedProbe::from_values(vec![30.0; 1000]);
    let mut sampler = Sampler::spawn(probe, 200.0, Duration::from_millis(10), clock).unwrap();
    assert!(wait_for(|| sampler.latest().is_some()));
    let a = sampler.latest();
    let b = sampler.latest();
    assert!(a.is_some() && b.is_some());
    assert!(b.unwrap().last_update_s >= a.unwrap().last_update_s);
}

#[test]
fn stall_time_grows_after_failures() {
    let clock = MonotonicClock::new();
    let probe = ScriptedProbe::new(vec![None; 1000]);
    let sampler = Sampler::spawn(probe, 200.0, Duration::from_millis(10), clock).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    let now_ms = roast_traits::Clock::ms_since(&clock, sampler.epoch());
    assert!(sampler.stalled_for(now_ms) >= 40);
}
