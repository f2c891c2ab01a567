//! `From` implementations bridging `roast_config` types to `roast_core` types.
//!
//! These keep the field-by-field mapping out of the CLI.

use roast_config::session::{EventRow, SampleRow, SessionMeta};

use crate::conditioner::Calibration;
use crate::config::{
    AdvisorCfg, FilterCfg, ForecastCfg, MilestoneTargets, ModelCfg, SensorCfg,
};
use crate::error::RoastError;
use crate::session::{Event, RoastMeta, Sample};

// ── FilterCfg ────────────────────────────────────────────────────────────────

/// `sample_dt_s` is not part of the filter section; the builder syncs it from the sensor.
impl From<&roast_config::FilterCfg> for FilterCfg {
    fn from(c: &roast_config::FilterCfg) -> Self {
        Self {
            min_c: c.min_c,
            max_c: c.max_c,
            median_window: c.median_window,
            ambient_window: c.ambient_window,
            ambient_min_samples: c.ambient_min_samples,
            ambient_ceiling_c: c.ambient_ceiling_c,
            drift_slope_c_per_s: c.drift_slope_c_per_s,
            max_step_c: c.max_step_c,
            freeze_s: c.freeze_s,
            ..FilterCfg::default()
        }
    }
}

// ── ModelCfg ─────────────────────────────────────────────────────────────────

impl From<&roast_config::ModelCfg> for ModelCfg {
    fn from(c: &roast_config::ModelCfg) -> Self {
        Self {
            alpha: c.alpha,
            ror_window: c.ror_window,
        }
    }
}

// ── ForecastCfg ──────────────────────────────────────────────────────────────

impl From<&roast_config::ForecastCfg> for ForecastCfg {
    fn from(c: &roast_config::ForecastCfg) -> Self {
        Self {
            window: c.window,
            min_samples: c.min_samples,
            max_eta_s: c.max_eta_s,
            projection_horizon_s: c.projection_horizon_s,
            ..ForecastCfg::default()
        }
    }
}

// ── Milestones / advisor / sensor ────────────────────────────────────────────

impl From<&roast_config::MilestonesCfg> for MilestoneTargets {
    fn from(c: &roast_config::MilestonesCfg) -> Self {
        Self {
            first_crack_c: c.first_crack_c,
            drop_c: c.drop_c,
        }
    }
}

impl From<&roast_config::AdvisorCfg> for AdvisorCfg {
    fn from(c: &roast_config::AdvisorCfg) -> Self {
        Self {
            tolerance: c.tolerance,
            ror_target: c.ror_target,
        }
    }
}

impl From<&roast_config::SensorCfg> for SensorCfg {
    fn from(c: &roast_config::SensorCfg) -> Self {
        Self {
            sample_hz: c.sample_hz,
            input_is_fahrenheit: c.input_is_fahrenheit,
            read_timeout_ms: c.read_timeout_ms,
        }
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl From<&roast_config::PersistedCalibration> for Calibration {
    fn from(c: &roast_config::PersistedCalibration) -> Self {
        Self {
            offset_c: c.offset_c,
            scale_pct: c.scale_pct,
        }
    }
}

impl Calibration {
    /// Persisted form, carrying the acquisition rate alongside.
    pub fn to_persisted(self, sample_hz: f64) -> roast_config::PersistedCalibration {
        roast_config::PersistedCalibration {
            offset_c: self.offset_c,
            scale_pct: self.scale_pct,
            sample_hz,
        }
    }
}

// ── Session rows ─────────────────────────────────────────────────────────────

impl From<&Sample> for SampleRow {
    fn from(s: &Sample) -> Self {
        Self {
            t_sec: s.time_sec,
            et_c: s.external_temp_c,
            bt_est_c: s.estimated_temp_c,
            ror: s.rate_c_per_min,
            gas: s.control_gas,
            air: s.control_air,
            set_temp: s.setpoint_c,
        }
        .rounded()
    }
}

impl From<&SampleRow> for Sample {
    fn from(r: &SampleRow) -> Self {
        Self {
            time_sec: r.t_sec,
            external_temp_c: r.et_c,
            estimated_temp_c: r.bt_est_c,
            rate_c_per_min: r.ror,
            control_gas: r.gas,
            control_air: r.air,
            setpoint_c: r.set_temp,
        }
    }
}

impl From<&Event> for EventRow {
    fn from(e: &Event) -> Self {
        EventRow {
            event: e.label.as_str().to_string(),
            t_sec: e.time_sec,
            temp_c: e.temp_c,
        }
        .rounded()
    }
}

impl TryFrom<&EventRow> for Event {
    type Error = RoastError;

    fn try_from(r: &EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            label: r.event.parse()?,
            time_sec: r.t_sec,
            temp_c: r.temp_c,
        })
    }
}

impl From<&SessionMeta> for RoastMeta {
    fn from(m: &SessionMeta) -> Self {
        Self {
            origin: m.origin.clone(),
            density: m.density.clone(),
            moisture: m.moisture.clone(),
            charge_mass_g: m.charge_mass_g.clone(),
            process: m.process.clone(),
            brew_target: m.brew_target.clone(),
        }
    }
}
