#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core roast estimation pipeline (hardware-agnostic).
//!
//! Estimates bean temperature (BT) from the measured environment temperature
//! (ET), tracks rate of rise (RoR) and forecasts milestones. All probe access
//! goes through `roast_traits::TemperatureProbe`.
//!
//! ## Architecture
//!
//! - **Conditioning**: unit conversion and affine calibration (`conditioner`)
//! - **Filtering**: range check, near-ambient slew clamp, drift freeze, median (`stream_filter`)
//! - **Estimation**: exponential smoother with windowed RoR (`estimator`)
//! - **Forecasting**: linear time-to-target and display projection (`forecast`)
//! - **Milestones**: regression predictor recalibrated at first crack (`milestone`)
//! - **Advice**: burner/airflow hint against a RoR target curve (`advisor`)
//! - **Orchestration**: `Session`, built by `SessionBuilder`, driven by `runner`
//!
//! ```no_run
//! use roast_core::{Session, SensorSnapshot};
//!
//! let mut session = Session::builder().try_build()?;
//! session.start();
//! let snap = SensorSnapshot { raw_value: 180.0, is_valid: true, last_update_s: 0.0, source_label: "doc" };
//! let report = session.tick(0.0, Some(snap));
//! println!("BT ≈ {:?}", report.estimate_c);
//! # Ok::<(), eyre::Report>(())
//! ```

pub mod advisor;
pub mod builder;
pub mod conditioner;
pub mod config;
pub mod conversions;
pub mod error;
pub mod estimator;
pub mod forecast;
pub mod hw_error;
pub mod milestone;
pub mod ring;
pub mod runner;
pub mod sampler;
pub mod session;
pub mod status;
pub mod stream_filter;
pub mod util;

pub use advisor::{Advice, RorTarget};
pub use builder::SessionBuilder;
pub use conditioner::{Calibration, condition};
pub use config::{
    AdvisorCfg, FilterCfg, ForecastCfg, MilestoneTargets, ModelCfg, PredictorCfg, SensorCfg,
};
pub use error::{BuildError, Report, Result, RoastError};
pub use estimator::{Estimate, EstimationModel};
pub use forecast::Forecaster;
pub use milestone::{MilestonePredictor, Prediction};
pub use runner::{Command, RunParams, RunSummary, StopReason};
pub use sampler::{Sampler, SensorSnapshot};
pub use session::{Controls, Event, EventLabel, RoastMeta, Sample, Session, TickReport};
pub use status::{RunState, SensorStatus};
pub use stream_filter::{FilterOutput, StreamFilter};
