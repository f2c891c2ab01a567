//! Subcommand implementations: live run, replay, calibration and self-check.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel as xch;
use eyre::WrapErr;
use roast_config::{Config, PersistedCalibration, Profile};
use roast_core::runner::{self, Command, RunParams, RunSummary};
use roast_core::{Calibration, EventLabel, RoastError, SensorSnapshot, Session, TickReport};
use roast_hardware::{RetryingProbe, ScriptedProbe, SimulatedProbe};
use roast_traits::{MonotonicClock, TemperatureProbe};

use crate::cli::CalibrateMode;

/// Test hook: when set to "1" the probe times out on every read.
const SIM_TIMEOUT_ENV: &str = "ROAST_TEST_SIM_TIMEOUT";

pub struct LiveOpts {
    pub duration_s: Option<f64>,
    pub export: Option<PathBuf>,
    pub start: bool,
    pub every: usize,
    pub json: bool,
}

/// Stored calibration, or identity when the file is missing or unreadable.
fn load_calibration(cfg: &Config) -> Calibration {
    let path = Path::new(&cfg.files.calibration);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no calibration file, using identity");
        return Calibration::default();
    }
    match roast_config::load_calibration_json(path) {
        Ok(c) => Calibration::from(&c),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring calibration file");
            Calibration::default()
        }
    }
}

/// Profile selected by `[profile]`, if the profiles file has one.
fn load_profile(cfg: &Config) -> Option<Profile> {
    let path = Path::new(&cfg.files.profiles);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no profiles file");
        return None;
    }
    let profiles = match roast_config::load_profiles_json(path) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring profiles file");
            return None;
        }
    };
    let sel = &cfg.profile;
    let found = profiles.get(&sel.process, &sel.brew_target).cloned();
    if found.is_none() {
        tracing::warn!(
            process = %sel.process,
            brew_target = %sel.brew_target,
            "selected profile not found, using config defaults"
        );
    }
    found
}

fn build_session(cfg: &Config, calibration: Calibration) -> eyre::Result<Session> {
    let mut session = Session::builder()
        .with_config(cfg)
        .with_calibration(calibration)
        .try_build()?;
    if let Some(profile) = load_profile(cfg) {
        session.apply_profile(&profile)?;
        tracing::info!(
            process = %cfg.profile.process,
            brew_target = %cfg.profile.brew_target,
            "profile applied"
        );
    }
    let mut meta = session.meta().clone();
    meta.process = cfg.profile.process.clone();
    meta.brew_target = cfg.profile.brew_target.clone();
    session.set_meta(meta);
    Ok(session)
}

fn make_probe(cfg: &Config) -> Box<dyn TemperatureProbe + Send> {
    if std::env::var(SIM_TIMEOUT_ENV).ok().as_deref() == Some("1") {
        return Box::new(ScriptedProbe::new(vec![None; 1024]));
    }
    let sim =
        SimulatedProbe::new(MonotonicClock::new()).fahrenheit(cfg.sensor.input_is_fahrenheit);
    Box::new(RetryingProbe::new(sim, 2))
}

fn fmt_mmss(secs: f64) -> String {
    let s = secs.max(0.0).round() as u64;
    format!("{}:{:02}", s / 60, s % 60)
}

fn fmt_opt(v: Option<f64>, dp: usize) -> String {
    v.map_or_else(|| "--".to_string(), |x| format!("{x:.dp$}"))
}

fn human_line(r: &TickReport) -> String {
    let fc = r
        .eta_to_first_crack_s
        .map_or_else(|| "--".to_string(), fmt_mmss);
    let drop_eta = r.eta_to_drop_s.map_or_else(|| "--".to_string(), fmt_mmss);
    let mut line = format!(
        "t={:>6.1}s  ET {:>6}  BT {:>6}  RoR {:>5}/{:.1}  1C {:>5}  drop {:>5}  [{}] {}",
        r.time_s,
        fmt_opt(r.et_c, 1),
        fmt_opt(r.estimate_c, 1),
        fmt_opt(r.rate_c_per_min, 1),
        r.ror_target,
        fc,
        drop_eta,
        r.sensor_status.label(),
        r.advisory.text(),
    );
    if r.drift_warning {
        line.push_str("  (drift)");
    }
    line
}

/// Prints each tick as a JSON line, or every Nth tick as a human line.
struct TickPrinter {
    json: bool,
    every: usize,
    n: usize,
}

impl TickPrinter {
    fn new(json: bool, every: usize) -> Self {
        Self {
            json,
            every: every.max(1),
            n: 0,
        }
    }

    fn print(&mut self, r: &TickReport) {
        if self.json {
            match serde_json::to_string(r) {
                Ok(s) => println!("{s}"),
                Err(e) => tracing::warn!(error = %e, "tick serialization failed"),
            }
        } else {
            if self.n % self.every == 0 {
                println!("{}", human_line(r));
            }
            self.n += 1;
        }
    }
}

fn print_summary(json: bool, summary: &RunSummary, exported: Option<&Path>) -> eyre::Result<()> {
    if json {
        let v = serde_json::json!({
            "summary": summary,
            "export": exported.map(|p| p.display().to_string()),
        });
        println!("{v}");
    } else {
        println!(
            "done: {} samples, {} events in {:.1}s ({:?})",
            summary.samples, summary.events, summary.elapsed_s, summary.reason
        );
        if let Some(p) = exported {
            println!("exported to {}", p.display());
        }
    }
    Ok(())
}

pub fn run_live(cfg: &Config, opts: LiveOpts) -> eyre::Result<()> {
    let max_duration = match opts.duration_s {
        Some(d) if d.is_finite() && d > 0.0 => Some(Duration::from_secs_f64(d)),
        Some(d) => {
            return Err(eyre::Report::new(RoastError::Config(format!(
                "--duration-s must be > 0, got {d}"
            ))));
        }
        None => None,
    };
    let mut session = build_session(cfg, load_calibration(cfg))?;
    let clock = MonotonicClock::new();
    let timeout = Duration::from_millis(cfg.sensor.read_timeout_ms);
    let mut sampler =
        roast_core::Sampler::spawn(make_probe(cfg), cfg.sensor.sample_hz, timeout, clock)?;

    let (tx, rx) = xch::unbounded::<Command>();
    let ctrl_tx = tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = ctrl_tx.send(Command::Shutdown);
    }) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }
    if opts.start {
        let _ = tx.send(Command::Start);
        let _ = tx.send(Command::MarkEvent(EventLabel::Charge));
    }

    let params = RunParams {
        sample_hz: cfg.sensor.sample_hz,
        read_timeout_ms: cfg.sensor.read_timeout_ms,
        max_duration,
    };

    let mut printer = TickPrinter::new(opts.json, opts.every);
    let summary = runner::run(&mut session, &mut sampler, &clock, &params, &rx, |r| {
        printer.print(r)
    })?;
    drop(tx);

    let exported = match opts.export.as_deref() {
        Some(base) => Some(session.export(base)?.combined),
        None => None,
    };
    print_summary(opts.json, &summary, exported.as_deref())
}

/// Re-run a recorded ET trace through a fresh pipeline.
///
/// Exported ET is already conditioned, so the replay session uses identity
/// calibration and Celsius input regardless of the config.
pub fn replay(
    cfg: &Config,
    input: &Path,
    export: Option<&Path>,
    every: usize,
    json: bool,
) -> eyre::Result<()> {
    let record = roast_config::session::read_session(input)
        .wrap_err_with(|| format!("open replay input {}", input.display()))?;
    let mut cfg = cfg.clone();
    cfg.sensor.input_is_fahrenheit = false;
    let mut session = build_session(&cfg, Calibration::default())?;
    session.start();

    let mut events: Vec<(f64, EventLabel)> = record
        .events
        .iter()
        .filter_map(|row| match row.event.parse::<EventLabel>() {
            Ok(l) => Some((row.t_sec, l)),
            Err(e) => {
                tracing::warn!(error = %e, "skipping event row");
                None
            }
        })
        .collect();
    events.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut pending = events.into_iter().peekable();

    let mut printer = TickPrinter::new(json, every);
    let mut ticks = 0u64;
    let mut last_t = 0.0;
    for row in &record.samples {
        let snap = SensorSnapshot {
            raw_value: row.et_c,
            is_valid: row.et_c.is_finite(),
            last_update_s: row.t_sec,
            source_label: "replay",
        };
        let report = session.tick(row.t_sec, Some(snap));
        ticks += 1;
        if !report.rejected {
            last_t = row.t_sec;
        }
        while let Some((_, label)) = pending.next_if(|(t, _)| *t <= row.t_sec) {
            session.mark_event(label);
        }
        printer.print(&report);
    }
    for (_, label) in pending {
        session.mark_event(label);
    }
    tracing::info!(ticks, samples = session.samples().len(), "replay finished");

    let exported = match export {
        Some(base) => Some(session.export(base)?.combined),
        None => None,
    };
    let summary = RunSummary {
        ticks,
        samples: session.samples().len(),
        events: session.events().len(),
        elapsed_s: last_t,
        reason: runner::StopReason::Disconnected,
    };
    print_summary(json, &summary, exported.as_deref())
}

pub fn calibrate(
    cfg: &Config,
    out: Option<&Path>,
    mode: &CalibrateMode,
    json: bool,
) -> eyre::Result<()> {
    let persisted: PersistedCalibration = match mode {
        CalibrateMode::OnePoint { actual_c, raw_c } => {
            Calibration::one_point(*actual_c, *raw_c)?.to_persisted(cfg.sensor.sample_hz)
        }
        CalibrateMode::TwoPoint {
            actual1_c,
            raw1_c,
            actual2_c,
            raw2_c,
        } => Calibration::two_point((*actual1_c, *raw1_c), (*actual2_c, *raw2_c))?
            .to_persisted(cfg.sensor.sample_hz),
    };
    // Reject anything the session would refuse later.
    Calibration::new(persisted.offset_c, persisted.scale_pct)?;

    let path = out.map_or_else(|| PathBuf::from(&cfg.files.calibration), Path::to_path_buf);
    roast_config::save_calibration_json(&path, &persisted)?;
    tracing::info!(
        offset_c = persisted.offset_c,
        scale_pct = persisted.scale_pct,
        path = %path.display(),
        "calibration saved"
    );

    if json {
        let v = serde_json::json!({
            "calibration": persisted,
            "path": path.display().to_string(),
        });
        println!("{v}");
    } else {
        println!(
            "calibration saved to {}: offset {:+.2} °C, scale {:.2} %",
            path.display(),
            persisted.offset_c,
            persisted.scale_pct
        );
    }
    Ok(())
}

/// Config, profiles and one probe read. Probe failures surface as errors.
pub fn self_check(cfg: &Config, json: bool) -> eyre::Result<()> {
    let session = build_session(cfg, load_calibration(cfg))?;
    let mut probe = make_probe(cfg);
    let raw = probe
        .read(Duration::from_millis(cfg.sensor.read_timeout_ms))
        .map_err(|e| eyre::Report::new(roast_core::hw_error::map_probe_error(e.as_ref())))?;
    let calibrated = session
        .calibration()
        .apply(raw, cfg.sensor.input_is_fahrenheit);
    tracing::info!(source = probe.label(), raw, calibrated, "self-check probe read");

    if json {
        let v = serde_json::json!({
            "status": "ok",
            "source": probe.label(),
            "raw": raw,
            "calibrated_c": calibrated,
            "first_crack_c": session.targets().first_crack_c,
            "drop_c": session.targets().drop_c,
        });
        println!("{v}");
    } else {
        println!(
            "OK: {} reads {:.1} °C (raw {:.1}); targets 1C {:.1} °C, drop {:.1} °C",
            probe.label(),
            calibrated,
            raw,
            session.targets().first_crack_c,
            session.targets().drop_c
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mmss_formats_minutes() {
        assert_eq!(fmt_mmss(0.0), "0:00");
        assert_eq!(fmt_mmss(125.4), "2:05");
        assert_eq!(fmt_mmss(-3.0), "0:00");
    }

    #[test]
    fn printer_honours_every() {
        let mut p = TickPrinter::new(false, 0);
        assert_eq!(p.every, 1);
        p.print(&Session::builder().try_build().unwrap().tick(0.0, None));
        assert_eq!(p.n, 1);
    }
}
