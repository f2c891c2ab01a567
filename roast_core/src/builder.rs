//! Fallible builder for `Session`.
//!
//! Every part has a default, so `Session::builder().try_build()` always has
//! something to validate; invalid settings come back as `BuildError`.

use crate::advisor::RorTarget;
use crate::conditioner::Calibration;
use crate::config::*;
use crate::error::{BuildError, Result};
use crate::estimator::EstimationModel;
use crate::forecast::Forecaster;
use crate::milestone::MilestonePredictor;
use crate::session::{Controls, RoastMeta, Session};
use crate::status::RunState;
use crate::stream_filter::StreamFilter;

#[derive(Debug, Default, Clone)]
pub struct SessionBuilder {
    filter: Option<FilterCfg>,
    model: Option<ModelCfg>,
    forecast: Option<ForecastCfg>,
    predictor: Option<PredictorCfg>,
    advisor: Option<AdvisorCfg>,
    targets: Option<MilestoneTargets>,
    sensor: Option<SensorCfg>,
    calibration: Option<Calibration>,
    ror_target: Option<RorTarget>,
    controls: Option<Controls>,
    meta: Option<RoastMeta>,
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(
    filter: &FilterCfg,
    forecast: &ForecastCfg,
    predictor: &PredictorCfg,
    advisor: &AdvisorCfg,
    targets: &MilestoneTargets,
    sensor: &SensorCfg,
    calibration: &Calibration,
) -> Result<()> {
    if !(sensor.sample_hz.is_finite() && sensor.sample_hz > 0.0) {
        return Err(invalid("sensor.sample_hz must be > 0"));
    }
    if filter.min_c.is_nan() || filter.max_c.is_nan() || filter.min_c >= filter.max_c {
        return Err(invalid("filter.min_c must be < filter.max_c"));
    }
    if filter.median_window == 0 {
        return Err(invalid("filter.median_window must be >= 1"));
    }
    if filter.ambient_window < 2 {
        return Err(invalid("filter.ambient_window must be >= 2"));
    }
    if !(filter.freeze_s.is_finite() && filter.freeze_s >= 0.0) {
        return Err(invalid("filter.freeze_s must be >= 0"));
    }
    if forecast.min_samples < 2 || forecast.projection_min_samples < 2 {
        return Err(invalid("forecast minimum sample counts must be >= 2"));
    }
    if forecast.window < forecast.min_samples {
        return Err(invalid("forecast.window must be >= forecast.min_samples"));
    }
    if predictor.roasts == 0 || predictor.samples_per_roast == 0 {
        return Err(invalid("predictor bootstrap needs at least one sample"));
    }
    if !(0.0..=1.0).contains(&predictor.blend_new) {
        return Err(invalid("predictor.blend_new must be in [0, 1]"));
    }
    if !(advisor.tolerance.is_finite() && advisor.tolerance >= 0.0) {
        return Err(invalid("advisor.tolerance must be >= 0"));
    }
    if !(targets.first_crack_c.is_finite() && targets.drop_c.is_finite()) {
        return Err(invalid("milestone targets must be finite"));
    }
    if targets.drop_c < targets.first_crack_c {
        return Err(invalid("drop target must be >= first crack target"));
    }
    if !(calibration.offset_c.is_finite()
        && calibration.scale_pct.is_finite()
        && calibration.scale_pct != 0.0)
    {
        return Err(invalid("calibration must be finite with a non-zero scale"));
    }
    Ok(())
}

impl SessionBuilder {
    /// Validate every part and assemble the session. The predictor bootstrap runs here.
    pub fn try_build(self) -> Result<Session> {
        let mut filter = self.filter.unwrap_or_default();
        let model = self.model.unwrap_or_default();
        let forecast = self.forecast.unwrap_or_default();
        let predictor = self.predictor.unwrap_or_default();
        let advisor = self.advisor.unwrap_or_default();
        let targets = self.targets.unwrap_or_default();
        let sensor = self.sensor.unwrap_or_default();
        let calibration = self.calibration.unwrap_or_default();

        validate(
            &filter,
            &forecast,
            &predictor,
            &advisor,
            &targets,
            &sensor,
            &calibration,
        )?;

        let sample_dt = sensor.sample_dt();
        filter.sample_dt_s = sample_dt;
        let model = EstimationModel::new(&model)
            .map_err(|_| invalid("model.alpha must be in (0.0, 1.0]"))?;
        let predictor = MilestonePredictor::new(targets.first_crack_c, predictor)?;
        let ror_target = self
            .ror_target
            .unwrap_or(RorTarget::Constant(advisor.ror_target));

        Ok(Session {
            calibration,
            input_is_fahrenheit: sensor.input_is_fahrenheit,
            sample_dt,
            filter: StreamFilter::new(filter),
            model,
            forecaster: Forecaster::new(forecast),
            predictor,
            targets,
            ror_target,
            advisor,
            controls: self.controls.unwrap_or_default(),
            meta: self.meta.unwrap_or_default(),
            samples: Vec::new(),
            events: Vec::new(),
            state: RunState::Idle,
            last_tick_s: None,
            last_snapshot_s: None,
            last_filtered: f64::NAN,
            last_et: None,
        })
    }

    /// Seed every section from a loaded TOML config.
    pub fn with_config(self, cfg: &roast_config::Config) -> Self {
        self.with_sensor((&cfg.sensor).into())
            .with_filter((&cfg.filter).into())
            .with_model((&cfg.model).into())
            .with_forecast((&cfg.forecast).into())
            .with_targets((&cfg.milestones).into())
            .with_advisor((&cfg.advisor).into())
    }
}

/// Chainable setters.
impl SessionBuilder {
    pub fn with_filter(mut self, filter: FilterCfg) -> Self {
        self.filter = Some(filter);
        self
    }
    pub fn with_model(mut self, model: ModelCfg) -> Self {
        self.model = Some(model);
        self
    }
    pub fn with_forecast(mut self, forecast: ForecastCfg) -> Self {
        self.forecast = Some(forecast);
        self
    }
    /// Configure the milestone predictor bootstrap.
    pub fn with_predictor(mut self, predictor: PredictorCfg) -> Self {
        self.predictor = Some(predictor);
        self
    }
    pub fn with_advisor(mut self, advisor: AdvisorCfg) -> Self {
        self.advisor = Some(advisor);
        self
    }
    pub fn with_targets(mut self, targets: MilestoneTargets) -> Self {
        self.targets = Some(targets);
        self
    }
    pub fn with_sensor(mut self, sensor: SensorCfg) -> Self {
        self.sensor = Some(sensor);
        self
    }
    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = Some(calibration);
        self
    }
    /// Overrides the constant `advisor.ror_target` fallback.
    pub fn with_ror_target(mut self, target: RorTarget) -> Self {
        self.ror_target = Some(target);
        self
    }
    pub fn with_controls(mut self, controls: Controls) -> Self {
        self.controls = Some(controls);
        self
    }
    pub fn with_meta(mut self, meta: RoastMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}
