//! Exponential-smoothing BT estimator with windowed rate of rise.
//!
//! - Seeding: the first finite input becomes the estimate verbatim.
//! - Update: `estimate += alpha * (input - estimate)`.
//! - RoR: two-sample-back difference in °C/min, then replaced by the
//!   NaN-ignoring mean of the trailing `W` stored rates once `W` exist.
//!
//! The four histories are index-aligned: every `step` appends to all of them,
//! including steps with a non-finite input.
use crate::config::ModelCfg;
use crate::error::RoastError;
use crate::util::nan_mean;

/// Guards the rate denominator against zero time spans.
const RATE_EPS_S: f64 = 1e-6;

/// Output of one recorded step. Fields are NaN when unknown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub estimate: f64,
    pub rate: f64,
}

/// Normalize a configured RoR window to an odd size of at least 5.
#[inline]
pub fn normalize_ror_window(w: usize) -> usize {
    ((w / 2) * 2 + 1).max(5)
}

fn validate_alpha(alpha: f64) -> Result<f64, RoastError> {
    if alpha.is_finite() && alpha > 0.0 && alpha <= 1.0 {
        Ok(alpha)
    } else {
        Err(RoastError::Config(format!(
            "alpha must be in (0.0, 1.0], got {alpha}"
        )))
    }
}

#[derive(Debug, Clone)]
pub struct EstimationModel {
    alpha: f64,
    window: usize,
    estimate: Option<f64>,
    times: Vec<f64>,
    externals: Vec<f64>,
    estimates: Vec<f64>,
    rates: Vec<f64>,
}

impl EstimationModel {
    pub fn new(cfg: &ModelCfg) -> Result<Self, RoastError> {
        Ok(Self {
            alpha: validate_alpha(cfg.alpha)?,
            window: normalize_ror_window(cfg.ror_window),
            estimate: None,
            times: Vec::new(),
            externals: Vec::new(),
            estimates: Vec::new(),
            rates: Vec::new(),
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) -> Result<(), RoastError> {
        self.alpha = validate_alpha(alpha)?;
        Ok(())
    }

    pub fn ror_window(&self) -> usize {
        self.window
    }

    /// Current estimate; `None` until seeded by a finite input.
    pub fn estimate(&self) -> Option<f64> {
        self.estimate
    }

    /// Seed or smooth toward `input`; returns the (possibly unchanged) estimate or NaN.
    fn update(&mut self, input: f64) -> f64 {
        if !input.is_finite() {
            return self.estimate.unwrap_or(f64::NAN);
        }
        let next = match self.estimate {
            Some(e) => e + self.alpha * (input - e),
            None => input,
        };
        self.estimate = Some(next);
        next
    }

    /// Record one sample. Times earlier than the last recorded one are clamped to it.
    pub fn step(&mut self, time_sec: f64, input: f64) -> Estimate {
        let t = match self.times.last() {
            Some(&last) if time_sec.is_nan() || time_sec < last => {
                tracing::warn!(time_sec, last, "estimator time went backwards, clamping");
                last
            }
            _ => time_sec,
        };
        let est = self.update(input);

        self.times.push(t);
        self.externals.push(input);
        self.estimates.push(est);

        let n = self.estimates.len();
        let raw_rate = if n >= 3 {
            (self.estimates[n - 1] - self.estimates[n - 3])
                / (self.times[n - 1] - self.times[n - 3] + RATE_EPS_S)
                * 60.0
        } else {
            f64::NAN
        };
        self.rates.push(raw_rate);
        if self.rates.len() >= self.window {
            let smoothed = nan_mean(&self.rates[self.rates.len() - self.window..]);
            if let Some(last) = self.rates.last_mut() {
                *last = smoothed;
            }
        }

        Estimate {
            estimate: est,
            rate: self.last_rate(),
        }
    }

    /// Track the live reading without recording anything.
    pub fn update_idle(&mut self, input: f64) -> f64 {
        self.update(input)
    }

    pub fn last_rate(&self) -> f64 {
        self.rates.last().copied().unwrap_or(f64::NAN)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn externals(&self) -> &[f64] {
        &self.externals
    }

    pub fn estimates(&self) -> &[f64] {
        &self.estimates
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// Clear histories and unseed; alpha and window are kept.
    pub fn reset(&mut self) {
        self.estimate = None;
        self.times.clear();
        self.externals.clear();
        self.estimates.clear();
        self.rates.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(alpha: f64) -> EstimationModel {
        EstimationModel::new(&ModelCfg {
            alpha,
            ror_window: 9,
        })
        .unwrap()
    }

    #[test]
    fn window_normalization() {
        assert_eq!(normalize_ror_window(0), 5);
        assert_eq!(normalize_ror_window(4), 5);
        assert_eq!(normalize_ror_window(8), 9);
        assert_eq!(normalize_ror_window(9), 9);
        assert_eq!(normalize_ror_window(12), 13);
    }

    #[test]
    fn first_finite_input_seeds_verbatim() {
        let mut m = model(0.12);
        let e = m.step(0.0, 150.0);
        assert_eq!(e.estimate, 150.0);
        assert_eq!(m.estimate(), Some(150.0));
    }

    #[test]
    fn nan_before_seed_keeps_histories_aligned() {
        let mut m = model(0.12);
        let e = m.step(0.0, f64::NAN);
        assert!(e.estimate.is_nan());
        assert_eq!(m.estimate(), None);
        m.step(1.0, 100.0);
        assert_eq!(m.times().len(), 2);
        assert_eq!(m.externals().len(), 2);
        assert_eq!(m.estimates().len(), 2);
        assert_eq!(m.rates().len(), 2);
        assert_eq!(m.estimate(), Some(100.0));
    }

    #[test]
    fn backwards_time_is_clamped() {
        let mut m = model(0.5);
        m.step(5.0, 100.0);
        m.step(3.0, 100.0);
        assert_eq!(m.times(), &[5.0, 5.0]);
    }

    #[test]
    fn idle_updates_do_not_record() {
        let mut m = model(0.5);
        assert_eq!(m.update_idle(100.0), 100.0);
        assert_eq!(m.update_idle(200.0), 150.0);
        assert!(m.is_empty());
    }

    #[test]
    fn set_alpha_rejects_out_of_range() {
        let mut m = model(0.12);
        assert!(m.set_alpha(0.0).is_err());
        assert!(m.set_alpha(1.01).is_err());
        assert!(m.set_alpha(f64::NAN).is_err());
        assert_eq!(m.alpha(), 0.12);
        m.set_alpha(1.0).unwrap();
        assert_eq!(m.alpha(), 1.0);
    }

    #[test]
    fn reset_keeps_alpha() {
        let mut m = model(0.3);
        m.step(0.0, 100.0);
        m.reset();
        assert!(m.is_empty());
        assert_eq!(m.estimate(), None);
        assert_eq!(m.alpha(), 0.3);
    }
}
