use std::time::Duration;

use roast_traits::TemperatureProbe;

use crate::error::HwError;

/// Probe wrapper that retries transient timeouts a bounded number of times
/// before surfacing the error to the sampler.
pub struct RetryingProbe<P> {
    inner: P,
    max_retries: u32,
}

impl<P: TemperatureProbe> RetryingProbe<P> {
    pub fn new(inner: P, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: TemperatureProbe> TemperatureProbe for RetryingProbe<P> {
    fn read(
        &mut self,
        timeout: Duration,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        let mut attempts = 0;
        loop {
            match self.inner.read(timeout) {
                Ok(v) => {
                    tracing::trace!(value = v, "probe sample");
                    return Ok(v);
                }
                Err(e) => {
                    let transient = e
                        .downcast_ref::<HwError>()
                        .is_some_and(HwError::is_transient);
                    if transient && attempts < self.max_retries {
                        attempts += 1;
                        tracing::warn!(retries = attempts, "probe timeout, retrying");
                        continue;
                    }
                    tracing::debug!(error = %e, "probe read failed");
                    return Err(e);
                }
            }
        }
    }

    fn label(&self) -> &'static str {
        self.inner.label()
    }
}
