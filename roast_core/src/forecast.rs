//! Local linear forecasting over the trailing estimate history.
//!
//! Nothing here keeps state: every tick refits on the most recent window so a
//! gas or airflow change is reflected within a few samples.
use crate::config::ForecastCfg;

/// Ordinary least squares `y ≈ a·x + b`. `None` with fewer than two points or
/// no spread in `x`.
pub fn linear_fit(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        let dx = x - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });
    if !(sxx.is_finite() && sxx > 0.0) {
        return None;
    }
    let a = sxy / sxx;
    let b = mean_y - a * mean_x;
    (a.is_finite() && b.is_finite()).then_some((a, b))
}

/// Finite `(t, v)` pairs among the last `window` entries of two aligned series.
fn trailing_pairs(times: &[f64], values: &[f64], window: usize) -> Vec<(f64, f64)> {
    let n = times.len().min(values.len());
    let start = n.saturating_sub(window);
    times[start..n]
        .iter()
        .zip(&values[start..n])
        .filter(|(t, v)| t.is_finite() && v.is_finite())
        .map(|(t, v)| (*t, *v))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Forecaster {
    cfg: ForecastCfg,
}

impl Forecaster {
    pub fn new(cfg: ForecastCfg) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &ForecastCfg {
        &self.cfg
    }

    /// Seconds from the last sample until the fitted trend reaches `target`.
    ///
    /// `None` when fewer than `min_samples` finite pairs are available, the
    /// trend is flat, the target lies behind the trend, or the ETA exceeds
    /// `max_eta_s`.
    pub fn eta_seconds(&self, times: &[f64], values: &[f64], target: f64) -> Option<f64> {
        if !target.is_finite() {
            return None;
        }
        let pts = trailing_pairs(times, values, self.cfg.window);
        if pts.len() < self.cfg.min_samples {
            return None;
        }
        let (a, b) = linear_fit(&pts)?;
        if a.abs() < self.cfg.min_slope {
            return None;
        }
        let t_now = *times.last()?;
        let eta = (target - b) / a - t_now;
        if !eta.is_finite() || eta < 0.0 || eta > self.cfg.max_eta_s {
            return None;
        }
        Some(eta)
    }

    /// Straight-line projection for display, from the last fitted sample to
    /// `horizon_s` past the last recorded time. At least 90 points, one per
    /// 5 s for longer horizons.
    pub fn project(&self, times: &[f64], values: &[f64]) -> Option<Vec<(f64, f64)>> {
        let pts = trailing_pairs(times, values, self.cfg.projection_window);
        if pts.len() < self.cfg.projection_min_samples {
            return None;
        }
        let (a, b) = linear_fit(&pts)?;
        let t0 = pts.last()?.0;
        let t_end = times.last()? + self.cfg.projection_horizon_s;
        let steps = 90usize.max(((t_end - t0).max(1.0) / 5.0) as usize);
        let dt = (t_end - t0) / (steps - 1) as f64;
        Some(
            (0..steps)
                .map(|i| {
                    let t = t0 + dt * i as f64;
                    (t, a * t + b)
                })
                .collect(),
        )
    }
}
