//! Temperature sources for the roast pipeline.
//!
//! Only simulated sources live here: a clock-driven roast curve for demos and
//! bench runs, and a scripted sequence for tests and replays. Vendor probe
//! SDKs plug in behind the same `TemperatureProbe` trait.
pub mod error;
pub mod util;

use std::time::{Duration, Instant};

use roast_traits::{Clock, TemperatureProbe};

use crate::error::HwError;

pub use util::RetryingProbe;

/// Roast-like ET curve in °C at `elapsed` seconds after the simulator started.
///
/// Preheat 180→200 over 30 s, charge drop to 170 by 60 s, linear ramp to 230
/// by 540 s, then a slow oscillation around 230. A two-tone ripple is added
/// on top so smoothing has something to do.
pub fn roast_curve(elapsed: f64) -> f64 {
    let base = if elapsed < 30.0 {
        180.0 + 20.0 * (elapsed / 30.0)
    } else if elapsed < 60.0 {
        200.0 - 30.0 * ((elapsed - 30.0) / 30.0)
    } else if elapsed < 540.0 {
        170.0 + 60.0 * ((elapsed - 60.0) / 480.0)
    } else {
        230.0 + 2.0 * (elapsed / 15.0).sin()
    };
    let ripple = 0.6 * (elapsed / 7.0).sin() + 0.3 * (elapsed / 3.3).sin();
    base + ripple
}

/// Simulated probe following [`roast_curve`] on the supplied clock.
pub struct SimulatedProbe<C: Clock> {
    clock: C,
    start: Instant,
    fahrenheit: bool,
}

impl<C: Clock> SimulatedProbe<C> {
    pub fn new(clock: C) -> Self {
        let start = clock.now();
        Self {
            clock,
            start,
            fahrenheit: false,
        }
    }

    /// Emit readings in Fahrenheit, as some thermocouple interfaces do.
    pub fn fahrenheit(mut self, yes: bool) -> Self {
        self.fahrenheit = yes;
        self
    }
}

impl<C: Clock> TemperatureProbe for SimulatedProbe<C> {
    fn read(
        &mut self,
        _timeout: Duration,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        let c = roast_curve(self.clock.secs_since(self.start));
        Ok(if self.fahrenheit { c * 9.0 / 5.0 + 32.0 } else { c })
    }

    fn label(&self) -> &'static str {
        "simulator"
    }
}

/// Probe replaying a fixed sequence. `None` entries read as a timeout; once
/// the sequence is exhausted every read fails with [`HwError::Exhausted`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedProbe {
    readings: Vec<Option<f64>>,
    pos: usize,
}

impl ScriptedProbe {
    pub fn new(readings: Vec<Option<f64>>) -> Self {
        Self { readings, pos: 0 }
    }

    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(values.into_iter().map(Some).collect())
    }

    pub fn remaining(&self) -> usize {
        self.readings.len().saturating_sub(self.pos)
    }
}

impl TemperatureProbe for ScriptedProbe {
    fn read(
        &mut self,
        _timeout: Duration,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        let Some(next) = self.readings.get(self.pos).copied() else {
            return Err(Box::new(HwError::Exhausted(self.readings.len())));
        };
        self.pos += 1;
        next.ok_or_else(|| Box::new(HwError::Timeout) as Box<dyn std::error::Error + Send + Sync>)
    }

    fn label(&self) -> &'static str {
        "scripted"
    }
}
