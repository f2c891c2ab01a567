//! Runtime configuration for the roast pipeline.
//!
//! These are the structs the core components are built from. They are kept
//! separate from the TOML-deserialized config in `roast_config`; see
//! `conversions` for the bridge.

/// Sensor-side filter settings.
#[derive(Debug, Clone)]
pub struct FilterCfg {
    /// Plausible reading range in the calibrated domain.
    pub min_c: f64,
    pub max_c: f64,
    /// Median smoothing window (samples).
    pub median_window: usize,
    /// Ambient drift monitor window (samples).
    pub ambient_window: usize,
    /// Samples needed before the drift slope is evaluated.
    pub ambient_min_samples: usize,
    /// Drift logic and the slew clamp only apply below this temperature.
    pub ambient_ceiling_c: f64,
    /// Rise rate (°C/s) treated as ambient drift.
    pub drift_slope_c_per_s: f64,
    /// Max move per sample near ambient.
    pub max_step_c: f64,
    /// Output freeze after a drift detection (s).
    pub freeze_s: f64,
    /// Nominal sample period used for the drift slope (s).
    pub sample_dt_s: f64,
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
            sample_dt_s: 0.5,
        }
    }
}

/// Exponential smoother settings.
#[derive(Debug, Clone)]
pub struct ModelCfg {
    /// Smoothing factor in (0, 1].
    pub alpha: f64,
    /// RoR averaging window; normalized to an odd value >= 5.
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

/// Linear time-to-target forecaster and display projection.
#[derive(Debug, Clone)]
pub struct ForecastCfg {
    /// Trailing samples used for the ETA fit.
    pub window: usize,
    /// Minimum finite samples for an ETA.
    pub min_samples: usize,
    /// Slopes below this magnitude (°C/s) are treated as flat.
    pub min_slope: f64,
    /// ETAs beyond this are reported as unknown (s).
    pub max_eta_s: f64,
    /// Trailing samples used for the projection fit.
    pub projection_window: usize,
    /// Minimum finite samples for a projection.
    pub projection_min_samples: usize,
    /// How far past the last sample the projection runs (s).
    pub projection_horizon_s: f64,
}

impl Default for ForecastCfg {
    fn default() -> Self {
        Self {
            window: 20,
            min_samples: 4,
            min_slope: 1e-6,
            max_eta_s: 3600.0,
            projection_window: 60,
            projection_min_samples: 6,
            projection_horizon_s: 900.0,
        }
    }
}

/// Milestone predictor bootstrap and recalibration.
#[derive(Debug, Clone)]
pub struct PredictorCfg {
    pub roasts: usize,
    pub samples_per_roast: usize,
    pub seed: u64,
    /// Observation buffer capacity.
    pub capacity: usize,
    /// Remaining-time predictions are clamped to [0, max_remaining_s].
    pub max_remaining_s: f64,
    /// Weight of the freshly fitted weights when blending after a confirmed milestone.
    pub blend_new: f64,
}

impl Default for PredictorCfg {
    fn default() -> Self {
        Self {
            roasts: 420,
            samples_per_roast: 22,
            seed: 42,
            capacity: 240,
            max_remaining_s: 900.0,
            blend_new: 0.3,
        }
    }
}

/// Advisory dead band and fallback RoR target.
#[derive(Debug, Clone)]
pub struct AdvisorCfg {
    pub tolerance: f64,
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

/// Milestone temperatures the forecaster and predictor time against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MilestoneTargets {
    pub first_crack_c: f64,
    pub drop_c: f64,
}

impl Default for MilestoneTargets {
    fn default() -> Self {
        Self {
            first_crack_c: 196.0,
            drop_c: 205.0,
        }
    }
}

/// Probe acquisition settings.
#[derive(Debug, Clone)]
pub struct SensorCfg {
    pub sample_hz: f64,
    pub input_is_fahrenheit: bool,
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

impl SensorCfg {
    /// Sample period in seconds.
    pub fn sample_dt(&self) -> f64 {
        crate::util::period_secs(self.sample_hz)
    }
}
