//! Roast session: one object owning the whole estimation pipeline.
//!
//! Every tick runs, in order: clock check, sensor status, conditioning,
//! stream filter, estimator step (or idle tracking), ETA forecasts,
//! milestone predictor, RoR advisory. Commands mutate the session between
//! ticks only.

use std::fmt;
use std::str::FromStr;

use roast_config::session::{EventRow, SampleRow};
use serde::Serialize;

use crate::advisor::{self, Advice, RorTarget};
use crate::conditioner::Calibration;
use crate::config::{AdvisorCfg, MilestoneTargets};
use crate::error::RoastError;
use crate::estimator::EstimationModel;
use crate::forecast::Forecaster;
use crate::milestone::{MilestonePredictor, Prediction};
use crate::sampler::SensorSnapshot;
use crate::status::{RunState, SensorStatus};
use crate::stream_filter::StreamFilter;

/// User-confirmed roast milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventLabel {
    Charge,
    TurningPoint,
    DryEnd,
    FirstCrack,
    SecondCrack,
    Drop,
}

impl EventLabel {
    pub const ALL: [EventLabel; 6] = [
        EventLabel::Charge,
        EventLabel::TurningPoint,
        EventLabel::DryEnd,
        EventLabel::FirstCrack,
        EventLabel::SecondCrack,
        EventLabel::Drop,
    ];

    /// Label as written to event files.
    pub fn as_str(self) -> &'static str {
        match self {
            EventLabel::Charge => "CHARGE",
            EventLabel::TurningPoint => "TP",
            EventLabel::DryEnd => "DRY_END",
            EventLabel::FirstCrack => "1C",
            EventLabel::SecondCrack => "2C",
            EventLabel::Drop => "DROP",
        }
    }
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventLabel {
    type Err = RoastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        let label = match norm.as_str() {
            "CHARGE" => EventLabel::Charge,
            "TP" | "TURNING_POINT" => EventLabel::TurningPoint,
            "DRY_END" | "DRYEND" => EventLabel::DryEnd,
            "1C" | "FIRST_CRACK" => EventLabel::FirstCrack,
            "2C" | "SECOND_CRACK" => EventLabel::SecondCrack,
            "DROP" => EventLabel::Drop,
            _ => {
                return Err(RoastError::State(format!("unknown event label '{s}'")));
            }
        };
        Ok(label)
    }
}

/// Operator control settings copied into every recorded sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub gas: i32,
    pub air: i32,
    pub setpoint_c: i32,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            gas: 5,
            air: 5,
            setpoint_c: 0,
        }
    }
}

/// One recorded tick. NaN marks unknown values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub time_sec: f64,
    pub external_temp_c: f64,
    pub estimated_temp_c: f64,
    pub rate_c_per_min: f64,
    pub control_gas: i32,
    pub control_air: i32,
    pub setpoint_c: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Event {
    pub label: EventLabel,
    pub time_sec: f64,
    pub temp_c: f64,
}

/// Free-form bean and roast metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoastMeta {
    pub origin: String,
    pub density: String,
    pub moisture: String,
    pub charge_mass_g: String,
    pub process: String,
    pub brew_target: String,
}

impl Default for RoastMeta {
    fn default() -> Self {
        Self {
            origin: String::new(),
            density: String::new(),
            moisture: String::new(),
            charge_mass_g: String::new(),
            process: "washed".into(),
            brew_target: "espresso".into(),
        }
    }
}

/// Everything a display needs after one tick. Unknown values are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub time_s: f64,
    /// The tick was older than the previous one and was ignored.
    pub rejected: bool,
    pub state: RunState,
    pub sensor_status: SensorStatus,
    pub et_c: Option<f64>,
    pub estimate_c: Option<f64>,
    pub rate_c_per_min: Option<f64>,
    pub eta_to_first_crack_s: Option<f64>,
    pub eta_to_drop_s: Option<f64>,
    pub ai_predicted_remaining_s: Option<f64>,
    pub ai_predicted_at_s: Option<f64>,
    pub ror_target: f64,
    pub advisory: Advice,
    pub sample_count: usize,
    pub drift_warning: bool,
}

#[inline]
fn finite(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

/// Orchestrates conditioning, filtering, estimation and forecasting for one roast.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) calibration: Calibration,
    pub(crate) input_is_fahrenheit: bool,
    pub(crate) sample_dt: f64,
    pub(crate) filter: StreamFilter,
    pub(crate) model: EstimationModel,
    pub(crate) forecaster: Forecaster,
    pub(crate) predictor: MilestonePredictor,
    pub(crate) targets: MilestoneTargets,
    pub(crate) ror_target: RorTarget,
    pub(crate) advisor: AdvisorCfg,
    pub(crate) controls: Controls,
    pub(crate) meta: RoastMeta,
    pub(crate) samples: Vec<Sample>,
    pub(crate) events: Vec<Event>,
    pub(crate) state: RunState,
    pub(crate) last_tick_s: Option<f64>,
    /// Timestamp of the last snapshot pushed through the filter.
    pub(crate) last_snapshot_s: Option<f64>,
    /// Filter output for that snapshot, reused while the sensor has nothing new.
    pub(crate) last_filtered: f64,
    /// Last finite conditioned ET.
    pub(crate) last_et: Option<f64>,
}

impl Session {
    pub fn builder() -> crate::builder::SessionBuilder {
        crate::builder::SessionBuilder::default()
    }

    /// Process one sensor poll at session time `time_s`.
    pub fn tick(&mut self, time_s: f64, snapshot: Option<SensorSnapshot>) -> TickReport {
        if !time_s.is_finite() {
            tracing::warn!(time_s, "tick rejected: non-finite time");
            return self.rejected_report(time_s);
        }
        if let Some(last) = self.last_tick_s
            && time_s < last
        {
            tracing::warn!(
                error = %RoastError::ClockRegression { last, got: time_s },
                "tick rejected"
            );
            return self.rejected_report(time_s);
        }
        self.last_tick_s = Some(time_s);

        let sensor_status = SensorStatus::classify(snapshot.as_ref(), time_s, self.sample_dt);
        let (et, drift_warning) = self.condition_and_filter(time_s, sensor_status, snapshot);
        if et.is_finite() {
            self.last_et = Some(et);
        }

        let running = self.state == RunState::Running;
        let (estimate, rate) = if running {
            // A NaN reading holds the estimate inside the model; the ET history keeps the gap.
            let e = self.model.step(time_s, et);
            self.samples.push(Sample {
                time_sec: time_s,
                external_temp_c: et,
                estimated_temp_c: e.estimate,
                rate_c_per_min: e.rate,
                control_gas: self.controls.gas,
                control_air: self.controls.air,
                setpoint_c: self.controls.setpoint_c,
            });
            (e.estimate, e.rate)
        } else {
            (self.model.update_idle(et), f64::NAN)
        };

        let times = self.model.times();
        let estimates = self.model.estimates();
        let eta_fc = self
            .forecaster
            .eta_seconds(times, estimates, self.targets.first_crack_c);
        let eta_drop = self
            .forecaster
            .eta_seconds(times, estimates, self.targets.drop_c);

        let ai = self.predictor.observe(time_s, estimate, rate, running);

        let ror_target = self.ror_target.at(time_s, eta_fc, eta_drop);
        let advisory = advisor::suggest(rate, ror_target, self.advisor.tolerance);

        TickReport {
            time_s,
            rejected: false,
            state: self.state,
            sensor_status,
            et_c: finite(et),
            estimate_c: finite(estimate),
            rate_c_per_min: finite(rate),
            eta_to_first_crack_s: eta_fc,
            eta_to_drop_s: eta_drop,
            ai_predicted_remaining_s: ai.map(|p| p.remaining_s),
            ai_predicted_at_s: ai.map(|p| p.at_s),
            ror_target,
            advisory,
            sample_count: self.samples.len(),
            drift_warning,
        }
    }

    /// Conditioned, filtered ET for this tick (NaN when unusable) and the drift flag.
    fn condition_and_filter(
        &mut self,
        time_s: f64,
        status: SensorStatus,
        snapshot: Option<SensorSnapshot>,
    ) -> (f64, bool) {
        let snap = match (status, snapshot) {
            (SensorStatus::Ok, Some(s)) => s,
            (status, _) => {
                tracing::debug!(status = status.label(), "no usable reading this tick");
                return (f64::NAN, self.filter.is_frozen(time_s));
            }
        };
        if self.last_snapshot_s == Some(snap.last_update_s) {
            return (self.last_filtered, self.filter.is_frozen(time_s));
        }
        self.last_snapshot_s = Some(snap.last_update_s);

        let conditioned = self
            .calibration
            .apply(snap.raw_value, self.input_is_fahrenheit);
        let out = self.filter.push(time_s, conditioned);
        self.last_filtered = out.value.unwrap_or(f64::NAN);
        (self.last_filtered, out.drift_warning)
    }

    fn rejected_report(&self, time_s: f64) -> TickReport {
        TickReport {
            time_s,
            rejected: true,
            state: self.state,
            sensor_status: SensorStatus::NoData,
            et_c: self.last_et,
            estimate_c: self.model.estimate(),
            rate_c_per_min: None,
            eta_to_first_crack_s: None,
            eta_to_drop_s: None,
            ai_predicted_remaining_s: None,
            ai_predicted_at_s: None,
            ror_target: self.ror_target.at(time_s, None, None),
            advisory: Advice::Unavailable,
            sample_count: self.samples.len(),
            drift_warning: false,
        }
    }

    // --- commands ---------------------------------------------------------

    pub fn start(&mut self) {
        if self.state != RunState::Running {
            tracing::info!(samples = self.samples.len(), "recording started");
            self.state = RunState::Running;
        }
    }

    pub fn stop(&mut self) {
        if self.state != RunState::Idle {
            tracing::info!(samples = self.samples.len(), "recording stopped");
            self.state = RunState::Idle;
        }
    }

    /// Drop every log and all model state. Calibration, targets, controls and metadata survive.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.events.clear();
        self.model.reset();
        self.filter.reset();
        self.predictor.reset();
        self.state = RunState::Idle;
        self.last_tick_s = None;
        self.last_snapshot_s = None;
        self.last_filtered = f64::NAN;
        self.last_et = None;
        tracing::info!("session reset");
    }

    /// Record `label` at the last tick time. Marking first crack recalibrates the predictor.
    pub fn mark_event(&mut self, label: EventLabel) -> Event {
        let time_sec = self.last_tick_s.unwrap_or(0.0);
        let temp_c = self
            .model
            .estimate()
            .or(self.last_et)
            .unwrap_or(f64::NAN);
        let ev = Event {
            label,
            time_sec,
            temp_c,
        };
        self.events.push(ev);
        if label == EventLabel::FirstCrack {
            self.predictor.commit_first_crack(time_sec);
        }
        tracing::info!(event = %label, time_sec, temp_c, "event marked");
        ev
    }

    pub fn set_calibration(&mut self, offset_c: f64, scale_pct: f64) -> Result<(), RoastError> {
        self.calibration = Calibration::new(offset_c, scale_pct)?;
        tracing::info!(offset_c, scale_pct, "calibration updated");
        Ok(())
    }

    /// New first-crack and drop temperatures; the predictor is retargeted to first crack.
    pub fn set_milestone_targets(
        &mut self,
        first_crack_c: f64,
        drop_c: f64,
    ) -> Result<(), RoastError> {
        if !(first_crack_c.is_finite() && drop_c.is_finite()) {
            return Err(RoastError::Config(
                "milestone targets must be finite".into(),
            ));
        }
        let (min_c, max_c) = (self.filter.cfg().min_c, self.filter.cfg().max_c);
        if first_crack_c < min_c || drop_c > max_c {
            return Err(RoastError::Config(format!(
                "milestone targets must lie within [{min_c}, {max_c}] °C"
            )));
        }
        if drop_c < first_crack_c {
            return Err(RoastError::Config(format!(
                "drop target {drop_c} is below first crack target {first_crack_c}"
            )));
        }
        self.predictor.set_target_bt(first_crack_c)?;
        self.targets = MilestoneTargets {
            first_crack_c,
            drop_c,
        };
        Ok(())
    }

    pub fn set_alpha(&mut self, alpha: f64) -> Result<(), RoastError> {
        self.model.set_alpha(alpha)
    }

    pub fn set_controls(&mut self, controls: Controls) {
        self.controls = controls;
    }

    pub fn set_ror_target(&mut self, target: RorTarget) {
        self.ror_target = target;
    }

    /// Adopt a roast profile: smoothing, milestone targets and RoR target.
    pub fn apply_profile(&mut self, profile: &roast_config::Profile) -> Result<(), RoastError> {
        profile
            .validate()
            .map_err(|e| RoastError::Config(e.to_string()))?;
        self.set_alpha(profile.alpha)?;
        self.set_milestone_targets(profile.first_crack_bt, profile.drop_bt)?;
        self.ror_target = RorTarget::from_profile(profile);
        tracing::info!(
            alpha = profile.alpha,
            first_crack_c = profile.first_crack_bt,
            drop_c = profile.drop_bt,
            "profile applied"
        );
        Ok(())
    }

    pub fn set_meta(&mut self, meta: RoastMeta) {
        self.meta = meta;
    }

    // --- accessors --------------------------------------------------------

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn meta(&self) -> &RoastMeta {
        &self.meta
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn targets(&self) -> MilestoneTargets {
        self.targets
    }

    pub fn ror_target(&self) -> &RorTarget {
        &self.ror_target
    }

    pub fn model(&self) -> &EstimationModel {
        &self.model
    }

    pub fn last_tick_s(&self) -> Option<f64> {
        self.last_tick_s
    }

    pub fn last_prediction(&self) -> Option<Prediction> {
        self.predictor.last_prediction()
    }

    /// Metadata as persisted next to an export, with event count and calibration.
    pub fn meta_snapshot(&self) -> roast_config::session::SessionMeta {
        roast_config::session::SessionMeta {
            origin: self.meta.origin.clone(),
            density: self.meta.density.clone(),
            moisture: self.meta.moisture.clone(),
            charge_mass_g: self.meta.charge_mass_g.clone(),
            process: self.meta.process.clone(),
            brew_target: self.meta.brew_target.clone(),
            events_count: self.events.len(),
            offset_c: self.calibration.offset_c,
            scale_pct: self.calibration.scale_pct,
        }
    }

    /// Straight-line BT projection for display.
    pub fn project_bt(&self) -> Option<Vec<(f64, f64)>> {
        self.forecaster
            .project(self.model.times(), self.model.estimates())
    }

    /// Straight-line ET projection for display.
    pub fn project_et(&self) -> Option<Vec<(f64, f64)>> {
        self.forecaster
            .project(self.model.times(), self.model.externals())
    }

    // --- persistence ------------------------------------------------------

    /// Write the combined, split and metadata files next to `base`.
    pub fn export(
        &self,
        base: &std::path::Path,
    ) -> crate::Result<roast_config::session::SessionPaths> {
        let samples: Vec<SampleRow> = self.samples.iter().map(Into::into).collect();
        let events: Vec<EventRow> = self.events.iter().map(Into::into).collect();
        let paths =
            roast_config::session::write_session(base, &samples, &events, &self.meta_snapshot())?;
        tracing::info!(path = %paths.combined.display(), samples = samples.len(), "session exported");
        Ok(paths)
    }

    /// Replace the logs with a previously exported session. Model state is reset;
    /// events with unknown labels are skipped. Ticks earlier than the last
    /// imported time are rejected afterwards.
    pub fn import(&mut self, path: &std::path::Path) -> crate::Result<usize> {
        let record = roast_config::session::read_session(path)?;
        self.reset();
        self.samples = record.samples.iter().map(Into::into).collect();
        for row in &record.events {
            match Event::try_from(row) {
                Ok(ev) => self.events.push(ev),
                Err(e) => tracing::warn!(error = %e, "skipping event row"),
            }
        }
        // Later ticks must not land before the imported log.
        self.last_tick_s = self
            .samples
            .iter()
            .map(|s| s.time_sec)
            .chain(self.events.iter().map(|e| e.time_sec))
            .filter(|t| t.is_finite())
            .reduce(f64::max);
        tracing::info!(
            samples = self.samples.len(),
            events = self.events.len(),
            "session imported"
        );
        Ok(self.samples.len())
    }
}
