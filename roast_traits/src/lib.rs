pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// A thermocouple (or simulated) source of raw temperature readings.
///
/// Readings are in the probe's native unit; conversion and calibration happen
/// downstream in the core pipeline.
pub trait TemperatureProbe {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;

    /// Short human-readable name of the source, e.g. "simulator".
    fn label(&self) -> &'static str;
}

impl<P: TemperatureProbe + ?Sized> TemperatureProbe for Box<P> {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(timeout)
    }

    fn label(&self) -> &'static str {
        (**self).label()
    }
}
