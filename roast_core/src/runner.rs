//! Paced tick loop driving a `Session` from a background `Sampler`.
//!
//! One tick per sample period. Commands arrive on a crossbeam channel and are
//! applied between ticks, never during one.

use std::ops::ControlFlow;
use std::time::Duration;

use crossbeam_channel as xch;
use roast_traits::clock::Clock;
use serde::Serialize;

use crate::error::Result;
use crate::sampler::Sampler;
use crate::session::{Controls, EventLabel, RoastMeta, Session, TickReport};

/// Operator commands, mirrored by `Session` methods.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Reset,
    MarkEvent(EventLabel),
    SetCalibration { offset_c: f64, scale_pct: f64 },
    SetMilestoneTargets { first_crack_c: f64, drop_c: f64 },
    SetAlpha(f64),
    SetControls(Controls),
    ApplyProfile(Box<roast_config::Profile>),
    SetMeta(RoastMeta),
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct RunParams {
    pub sample_hz: f64,
    pub read_timeout_ms: u64,
    /// Stop after this much wall time; `None` runs until shutdown.
    pub max_duration: Option<Duration>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            sample_hz: 2.0,
            read_timeout_ms: 500,
            max_duration: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Shutdown,
    Disconnected,
    MaxDuration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub samples: usize,
    pub events: usize,
    pub elapsed_s: f64,
    pub reason: StopReason,
}

/// Compute the stall watchdog threshold in milliseconds.
///
/// Starts from a fast threshold of four read timeouts, widened to at least
/// two sample periods so a single missed sample never trips it. With a
/// bounded run the threshold stays strictly below the run length.
#[inline]
fn compute_stall_threshold_ms(sensor_timeout_ms: u64, period_ms: u64, max_run_ms: Option<u64>) -> u64 {
    let fast = fast_threshold_ms(sensor_timeout_ms);
    let two_p = two_periods_ms(period_ms);

    match max_run_ms {
        Some(max_run) if max_run < two_p => cap_below_max_run(fast, max_run),
        Some(max_run) => cap_below_max_run(fast.max(two_p), max_run),
        None => fast.max(two_p).max(1),
    }
}

/// Derive a quick stall threshold from per-read sensor timeout.
#[inline]
fn fast_threshold_ms(sensor_timeout_ms: u64) -> u64 {
    sensor_timeout_ms.saturating_mul(4)
}

/// Ensure the stall threshold spans at least two periods to tolerate one miss.
#[inline]
fn two_periods_ms(period_ms: u64) -> u64 {
    period_ms.saturating_mul(2)
}

/// Cap a threshold to be strictly below `max_run_ms` and at least 1ms.
#[inline]
fn cap_below_max_run(threshold: u64, max_run_ms: u64) -> u64 {
    threshold.min(max_run_ms.saturating_sub(1)).max(1)
}

#[inline]
fn stalled_now(elapsed_ms: u64, stalled_ms: u64, threshold_ms: u64) -> bool {
    elapsed_ms >= threshold_ms && stalled_ms > threshold_ms
}

/// Apply one command to the session. `Break` means the loop should stop.
///
/// Rejected commands are logged and otherwise ignored. `Reset` is applied
/// here too; callers that keep their own time base must re-anchor it.
pub fn apply_command(session: &mut Session, cmd: Command) -> ControlFlow<()> {
    let res = match cmd {
        Command::Start => {
            session.start();
            Ok(())
        }
        Command::Stop => {
            session.stop();
            Ok(())
        }
        Command::Reset => {
            session.reset();
            Ok(())
        }
        Command::MarkEvent(label) => {
            session.mark_event(label);
            Ok(())
        }
        Command::SetCalibration {
            offset_c,
            scale_pct,
        } => session.set_calibration(offset_c, scale_pct),
        Command::SetMilestoneTargets {
            first_crack_c,
            drop_c,
        } => session.set_milestone_targets(first_crack_c, drop_c),
        Command::SetAlpha(alpha) => session.set_alpha(alpha),
        Command::SetControls(controls) => {
            session.set_controls(controls);
            Ok(())
        }
        Command::ApplyProfile(profile) => session.apply_profile(&profile),
        Command::SetMeta(meta) => {
            session.set_meta(meta);
            Ok(())
        }
        Command::Shutdown => return ControlFlow::Break(()),
    };
    if let Err(e) = res {
        tracing::warn!(error = %e, "command rejected");
    }
    ControlFlow::Continue(())
}

/// Drive `session` until shutdown, command channel disconnect or `max_duration`.
///
/// Session time restarts at zero on `Command::Reset`; snapshot timestamps are
/// shifted into the same base before each tick.
pub fn run<C, F>(
    session: &mut Session,
    sampler: &mut Sampler,
    clock: &C,
    params: &RunParams,
    commands: &xch::Receiver<Command>,
    mut on_tick: F,
) -> Result<RunSummary>
where
    C: Clock,
    F: FnMut(&TickReport),
{
    let period = Duration::from_micros(crate::util::period_us(params.sample_hz));
    let period_ms = crate::util::period_ms(params.sample_hz);
    let max_run_ms = params
        .max_duration
        .map(|d| d.as_millis().min(u128::from(u64::MAX)) as u64);
    let stall_threshold_ms =
        compute_stall_threshold_ms(params.read_timeout_ms, period_ms, max_run_ms);

    let epoch = sampler.epoch();
    let started = clock.now();
    let mut origin_s = clock.secs_since(epoch);
    let mut ticks: u64 = 0;
    let mut stall_reported = false;

    tracing::info!(
        sample_hz = params.sample_hz,
        stall_threshold_ms,
        "roast loop start"
    );

    let reason = 'outer: loop {
        loop {
            match commands.try_recv() {
                Ok(Command::Reset) => {
                    session.reset();
                    origin_s = clock.secs_since(epoch);
                }
                Ok(cmd) => {
                    if apply_command(session, cmd).is_break() {
                        break 'outer StopReason::Shutdown;
                    }
                }
                Err(xch::TryRecvError::Empty) => break,
                Err(xch::TryRecvError::Disconnected) => break 'outer StopReason::Disconnected,
            }
        }

        let now_s = clock.secs_since(epoch) - origin_s;
        let snapshot = sampler.latest().map(|s| s.rebased(origin_s));
        let report = session.tick(now_s, snapshot);
        ticks += 1;
        on_tick(&report);

        let elapsed_ms = clock.ms_since(started);
        let stalled_ms = sampler.stalled_for(clock.ms_since(epoch));
        if stalled_now(elapsed_ms, stalled_ms, stall_threshold_ms) {
            if !stall_reported {
                tracing::warn!(stalled_ms, stall_threshold_ms, "sensor stalled, holding last estimate");
                stall_reported = true;
            }
        } else if stall_reported {
            tracing::info!("sensor recovered");
            stall_reported = false;
        }

        if max_run_ms.is_some_and(|max| elapsed_ms >= max) {
            break StopReason::MaxDuration;
        }
        clock.sleep(period);
    };

    let summary = RunSummary {
        ticks,
        samples: session.samples().len(),
        events: session.events().len(),
        elapsed_s: clock.secs_since(started),
        reason,
    };
    tracing::info!(
        ticks = summary.ticks,
        samples = summary.samples,
        events = summary.events,
        reason = ?summary.reason,
        "roast loop end"
    );
    Ok(summary)
}
