//! Sensor-side filtering: range rejection, ambient drift freeze, median smoothing.
//!
//! Near ambient temperature a thermocouple can chatter or creep in a way that
//! reads as a fast rise. The filter clamps per-sample slew there, watches the
//! slope of a short ambient window and, on a suspicious rise, freezes its
//! output for a few seconds. At roasting temperatures only the range check
//! and the median window apply.
use crate::config::FilterCfg;
use crate::ring::RingBuffer;
use crate::util::median;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterState {
    Normal,
    Frozen { until_s: f64 },
}

/// Result of pushing one raw reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterOutput {
    /// Smoothed value; `None` when the reading was rejected or nothing has been accepted yet.
    pub value: Option<f64>,
    /// False when this tick's reading was rejected.
    pub accepted: bool,
    /// True while the output is frozen after an ambient drift detection.
    pub drift_warning: bool,
}

#[derive(Debug, Clone)]
pub struct StreamFilter {
    cfg: FilterCfg,
    state: FilterState,
    median_win: RingBuffer<f64>,
    ambient: RingBuffer<f64>,
    last_accepted: Option<f64>,
    last_smoothed: Option<f64>,
}

impl StreamFilter {
    pub fn new(cfg: FilterCfg) -> Self {
        Self {
            median_win: RingBuffer::new(cfg.median_window),
            ambient: RingBuffer::new(cfg.ambient_window),
            cfg,
            state: FilterState::Normal,
            last_accepted: None,
            last_smoothed: None,
        }
    }

    pub fn cfg(&self) -> &FilterCfg {
        &self.cfg
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn last_smoothed(&self) -> Option<f64> {
        self.last_smoothed
    }

    fn in_range(&self, v: f64) -> bool {
        v.is_finite() && v >= self.cfg.min_c && v <= self.cfg.max_c
    }

    fn near_ambient(&self) -> bool {
        !self.ambient.is_empty()
            && self
                .ambient
                .iter()
                .all(|v| *v < self.cfg.ambient_ceiling_c)
    }

    /// Ambient window slope in °C/s, once enough samples are buffered.
    fn ambient_slope(&self) -> Option<f64> {
        if self.ambient.len() < self.cfg.ambient_min_samples.max(2) {
            return None;
        }
        let first = *self.ambient.front()?;
        let last = *self.ambient.back()?;
        let span = (self.ambient.len() as f64 * self.cfg.sample_dt_s).max(1e-6);
        Some((last - first) / span)
    }

    /// Push one calibrated reading taken at `now_s`.
    pub fn push(&mut self, now_s: f64, raw: f64) -> FilterOutput {
        if !self.in_range(raw) {
            tracing::debug!(value = raw, "reading rejected: out of plausible range");
            return FilterOutput {
                value: None,
                accepted: false,
                drift_warning: self.is_frozen(now_s),
            };
        }

        let v = match self.last_accepted {
            Some(prev) if self.near_ambient() => {
                let step = self.cfg.max_step_c;
                raw.clamp(prev - step, prev + step)
            }
            _ => raw,
        };
        self.last_accepted = Some(v);
        self.ambient.push(v);
        self.median_win.push(v);

        let slope = self.ambient_slope().unwrap_or(0.0);
        if slope > self.cfg.drift_slope_c_per_s && self.near_ambient() && !self.is_frozen(now_s) {
            let until_s = now_s + self.cfg.freeze_s;
            self.state = FilterState::Frozen { until_s };
            tracing::warn!(slope, until_s, "ambient drift detected, freezing output");
        }

        if let FilterState::Frozen { until_s } = self.state {
            if now_s < until_s {
                return FilterOutput {
                    value: self.last_smoothed,
                    accepted: true,
                    drift_warning: true,
                };
            }
            tracing::debug!("drift freeze elapsed, resuming");
            self.state = FilterState::Normal;
        }

        let window: Vec<f64> = self.median_win.iter().copied().collect();
        let smoothed = median(&window);
        self.last_smoothed = Some(smoothed);
        FilterOutput {
            value: Some(smoothed),
            accepted: true,
            drift_warning: false,
        }
    }

    pub fn is_frozen(&self, now_s: f64) -> bool {
        matches!(self.state, FilterState::Frozen { until_s } if now_s < until_s)
    }

    pub fn reset(&mut self) {
        self.state = FilterState::Normal;
        self.median_win.clear();
        self.ambient.clear();
        self.last_accepted = None;
        self.last_smoothed = None;
    }
}
