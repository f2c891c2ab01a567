#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas, calibration files and roast profiles.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `PersistedCalibration` is the `calibration.json` record shared with the UI.
//! - Reference-point calibration CSV performs a robust refit to reduce outlier
//!   influence before slope/intercept estimation.
//! - `Profiles` holds per-process, per-brew-target roast targets.
//! - `session` reads and writes exported roast sessions.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub mod session;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorCfg {
    /// Polling rate of the probe thread and of the estimation tick.
    pub sample_hz: f64,
    /// Raw readings arrive in Fahrenheit and are converted before calibration.
    pub input_is_fahrenheit: bool,
    /// Max wait per probe read (ms).
    pub read_timeout_ms: u64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            sample_hz: 2.0,
            input_is_fahrenheit: false,
            read_timeout_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterCfg {
    /// Plausible range; readings outside are rejected for the tick.
    pub min_c: f64,
    pub max_c: f64,
    /// Median smoothing window (samples).
    pub median_window: usize,
    /// Ambient drift monitor window (samples).
    pub ambient_window: usize,
    /// Samples required in the ambient window before the slope is trusted.
    pub ambient_min_samples: usize,
    /// Drift detection only applies while every monitored value is below this.
    pub ambient_ceiling_c: f64,
    /// Slope (°C/s) above which an ambient rise is treated as drift.
    pub drift_slope_c_per_s: f64,
    /// Largest single-sample move allowed near ambient.
    pub max_step_c: f64,
    /// Duration of the output freeze after drift is detected.
    pub freeze_s: f64,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            min_c: -10.0,
            max_c: 350.0,
            median_window: 7,
            ambient_window: 16,
            ambient_min_samples: 8,
            ambient_ceiling_c: 40.0,
            drift_slope_c_per_s: 0.5,
            max_step_c: 2.0,
            freeze_s: 5.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelCfg {
    /// Exponential smoothing factor in (0, 1].
    pub alpha: f64,
    /// Rate-of-rise averaging window; normalized to an odd value >= 5.
    pub ror_window: usize,
}

impl Default for ModelCfg {
    fn default() -> Self {
        Self {
            alpha: 0.12,
            ror_window: 9,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ForecastCfg {
    pub window: usize,
    pub min_samples: usize,
    pub max_eta_s: f64,
    /// Horizon of the display projection (s).
    pub projection_horizon_s: f64,
}

impl Default for ForecastCfg {
    fn default() -> Self {
        Self {
            window: 20,
            min_samples: 4,
            max_eta_s: 3600.0,
            projection_horizon_s: 900.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MilestonesCfg {
    pub first_crack_c: f64,
    pub drop_c: f64,
}

impl Default for MilestonesCfg {
    fn default() -> Self {
        Self {
            first_crack_c: 196.0,
            drop_c: 205.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AdvisorCfg {
    /// Dead band around the target RoR (°C/min).
    pub tolerance: f64,
    /// Fallback RoR target when no profile applies.
    pub ror_target: f64,
}

impl Default for AdvisorCfg {
    fn default() -> Self {
        Self {
            tolerance: 0.4,
            ror_target: 7.0,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilesCfg {
    pub calibration: String,
    pub profiles: String,
}

impl Default for FilesCfg {
    fn default() -> Self {
        Self {
            calibration: "calibration.json".to_string(),
            profiles: "profiles.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProfileSelect {
    pub process: String,
    pub brew_target: String,
}

impl Default for ProfileSelect {
    fn default() -> Self {
        Self {
            process: "washed".to_string(),
            brew_target: "espresso".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorCfg,
    pub filter: FilterCfg,
    pub model: ModelCfg,
    pub forecast: ForecastCfg,
    pub milestones: MilestonesCfg,
    pub advisor: AdvisorCfg,
    pub logging: Logging,
    pub files: FilesCfg,
    pub profile: ProfileSelect,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        if !(self.sensor.sample_hz.is_finite() && self.sensor.sample_hz > 0.0) {
            eyre::bail!("sensor.sample_hz must be > 0");
        }
        if self.sensor.sample_hz > 50.0 {
            eyre::bail!("sensor.sample_hz is unreasonably large (>50 Hz)");
        }
        if self.sensor.read_timeout_ms == 0 {
            eyre::bail!("sensor.read_timeout_ms must be >= 1");
        }

        // Filter
        if !(self.filter.min_c < self.filter.max_c) {
            eyre::bail!("filter.min_c must be < filter.max_c");
        }
        if self.filter.median_window == 0 {
            eyre::bail!("filter.median_window must be >= 1");
        }
        if self.filter.ambient_window < 2 {
            eyre::bail!("filter.ambient_window must be >= 2");
        }
        if self.filter.ambient_min_samples < 2
            || self.filter.ambient_min_samples > self.filter.ambient_window
        {
            eyre::bail!("filter.ambient_min_samples must be in [2, ambient_window]");
        }
        if self.filter.drift_slope_c_per_s <= 0.0 {
            eyre::bail!("filter.drift_slope_c_per_s must be > 0");
        }
        if self.filter.max_step_c <= 0.0 {
            eyre::bail!("filter.max_step_c must be > 0");
        }
        if self.filter.freeze_s.is_sign_negative() || self.filter.freeze_s > 60.0 {
            eyre::bail!("filter.freeze_s must be in [0, 60]");
        }

        // Model
        if !(self.model.alpha > 0.0 && self.model.alpha <= 1.0) {
            eyre::bail!("model.alpha must be in (0.0, 1.0]");
        }
        if self.model.ror_window == 0 {
            eyre::bail!("model.ror_window must be >= 1");
        }

        // Forecast
        if self.forecast.min_samples < 2 {
            eyre::bail!("forecast.min_samples must be >= 2");
        }
        if self.forecast.window < self.forecast.min_samples {
            eyre::bail!("forecast.window must be >= forecast.min_samples");
        }
        if self.forecast.max_eta_s <= 0.0 {
            eyre::bail!("forecast.max_eta_s must be > 0");
        }
        if self.forecast.projection_horizon_s <= 0.0 {
            eyre::bail!("forecast.projection_horizon_s must be > 0");
        }

        // Milestones
        if !(self.milestones.first_crack_c.is_finite() && self.milestones.drop_c.is_finite()) {
            eyre::bail!("milestones must be finite temperatures");
        }
        if self.milestones.drop_c < self.milestones.first_crack_c {
            eyre::bail!("milestones.drop_c must be >= milestones.first_crack_c");
        }

        // Advisor
        if self.advisor.tolerance.is_sign_negative() {
            eyre::bail!("advisor.tolerance must be >= 0");
        }

        Ok(())
    }

    /// Sample period in seconds derived from `sensor.sample_hz`.
    pub fn sample_dt(&self) -> f64 {
        1.0 / self.sensor.sample_hz.max(0.2)
    }
}

// ── calibration.json ─────────────────────────────────────────────────────────

/// Persisted probe calibration: `calibrated = raw * scale_pct / 100 + offset_c`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PersistedCalibration {
    pub offset_c: f64,
    pub scale_pct: f64,
    #[serde(default = "default_sample_hz")]
    pub sample_hz: f64,
}

fn default_sample_hz() -> f64 {
    2.0
}

impl Default for PersistedCalibration {
    fn default() -> Self {
        Self {
            offset_c: 0.0,
            scale_pct: 100.0,
            sample_hz: default_sample_hz(),
        }
    }
}

pub fn load_calibration_json(path: &Path) -> eyre::Result<PersistedCalibration> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read calibration {:?}: {}", path, e))?;
    let cal: PersistedCalibration = serde_json::from_str(&text)
        .map_err(|e| eyre::eyre!("parse calibration {:?}: {}", path, e))?;
    if !(cal.offset_c.is_finite() && cal.scale_pct.is_finite() && cal.scale_pct != 0.0) {
        eyre::bail!("calibration {:?} has non-finite or zero parameters", path);
    }
    Ok(cal)
}

/// Write via a sibling temp file and rename so a crash never leaves a torn file.
pub fn save_calibration_json(path: &Path, cal: &PersistedCalibration) -> eyre::Result<()> {
    let text = serde_json::to_string_pretty(cal)?;
    write_atomic(path, text.as_bytes())
        .map_err(|e| eyre::eyre!("write calibration {:?}: {}", path, e))
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    let tmp = path.with_extension("new");
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(tmp, path)
}

// ── profiles.json ────────────────────────────────────────────────────────────

/// One point of an explicit RoR target curve.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    pub t: f64,
    pub v: f64,
}

/// Roast targets for one process / brew target combination.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub alpha: f64,
    pub ror_target: f64,
    #[serde(rename = "firstCrackBT")]
    pub first_crack_bt: f64,
    #[serde(rename = "dropBT")]
    pub drop_bt: f64,
    pub ror_curve: Option<Vec<ProfilePoint>>,
    pub ror_target_start: Option<f64>,
    pub ror_target_first_crack: Option<f64>,
    pub ror_target_end: Option<f64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            alpha: 0.12,
            ror_target: 7.0,
            first_crack_bt: 196.0,
            drop_bt: 205.0,
            ror_curve: None,
            ror_target_start: None,
            ror_target_first_crack: None,
            ror_target_end: None,
        }
    }
}

impl Profile {
    pub fn validate(&self) -> eyre::Result<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            eyre::bail!("profile alpha must be in (0.0, 1.0]");
        }
        if !(self.first_crack_bt.is_finite() && self.drop_bt.is_finite()) {
            eyre::bail!("profile milestone temperatures must be finite");
        }
        let bad_point = self
            .ror_curve
            .iter()
            .flatten()
            .any(|p| !(p.t.is_finite() && p.v.is_finite()));
        if bad_point {
            eyre::bail!("profile rorCurve points must be finite");
        }
        Ok(())
    }
}

/// `process -> brew target -> profile`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Profiles(pub BTreeMap<String, BTreeMap<String, Profile>>);

impl Profiles {
    pub fn get(&self, process: &str, brew_target: &str) -> Option<&Profile> {
        self.0.get(process).and_then(|m| m.get(brew_target))
    }
}

pub fn parse_profiles(s: &str) -> eyre::Result<Profiles> {
    let profiles: Profiles =
        serde_json::from_str(s).map_err(|e| eyre::eyre!("parse profiles: {}", e))?;
    for (process, by_brew) in &profiles.0 {
        for (brew, p) in by_brew {
            p.validate()
                .map_err(|e| eyre::eyre!("profile {}/{}: {}", process, brew, e))?;
        }
    }
    Ok(profiles)
}

pub fn load_profiles_json(path: &Path) -> eyre::Result<Profiles> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read profiles {:?}: {}", path, e))?;
    parse_profiles(&text)
}
