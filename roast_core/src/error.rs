use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoastError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("calibration error: {0}")]
    Calibration(String),
    #[error("sensor error: {0}")]
    Sensor(String),
    #[error("clock regression: tick at {got:.3}s is before last tick at {last:.3}s")]
    ClockRegression { last: f64, got: f64 },
    #[error("invalid state: {0}")]
    State(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
