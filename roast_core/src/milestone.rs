//! Regression-based first-crack predictor.
//!
//! A linear model over `[1, t, bt, ror, bt·ror]` predicts the seconds left
//! until the milestone. The prior is fitted on synthetic roast curves drawn
//! from a fixed-seed generator, so every build starts from the same weights.
//! Observations captured during a roast are relabelled once the user confirms
//! the milestone and folded into the weights with a conservative blend.
use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::config::PredictorCfg;
use crate::error::RoastError;
use crate::ring::RingBuffer;

pub const N_FEATURES: usize = 5;
pub type Features = [f64; N_FEATURES];
pub type Weights = [f64; N_FEATURES];

/// Targets closer than this are considered unchanged.
const TARGET_TOLERANCE_C: f64 = 1e-3;

#[inline]
pub fn features(t: f64, bt: f64, ror: f64) -> Features {
    [1.0, t, bt, ror, bt * ror]
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Session time at which the milestone is expected (s).
    pub at_s: f64,
    /// Seconds remaining from the observation time.
    pub remaining_s: f64,
}

/// Minimum-norm least squares via SVD. Singular values below
/// `max_sv · eps · max(rows, cols)` are treated as zero.
pub fn least_squares(rows: &[Features], labels: &[f64]) -> Option<Weights> {
    if rows.is_empty() || rows.len() != labels.len() {
        return None;
    }
    let x = DMatrix::from_fn(rows.len(), N_FEATURES, |r, c| rows[r][c]);
    let y = DVector::from_column_slice(labels);
    let svd = x.svd(true, true);
    let max_sv = svd.singular_values.max();
    let eps = max_sv * f64::EPSILON * rows.len().max(N_FEATURES) as f64;
    let sol = svd.solve(&y, eps).ok()?;
    let mut w = [0.0; N_FEATURES];
    for (dst, src) in w.iter_mut().zip(sol.iter()) {
        *dst = *src;
    }
    w.iter().all(|v| v.is_finite()).then_some(w)
}

/// Fit the prior on synthetic roasts that approach `target_c` exponentially.
pub fn bootstrap_weights(target_c: f64, cfg: &PredictorCfg) -> Result<Weights, RoastError> {
    // Huge targets collapse the sampling range below f64 resolution.
    if !target_c.is_finite() || target_c - 2.0 >= target_c + 4.0 {
        return Err(RoastError::Config(format!(
            "milestone target {target_c} is out of range"
        )));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    let noise_dist = Normal::new(0.0, 0.6)
        .map_err(|e| RoastError::State(format!("bootstrap noise distribution: {e}")))?;

    let n = cfg.roasts * cfg.samples_per_roast;
    let mut rows = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..cfg.roasts {
        let fc_time: f64 = rng.gen_range(390.0..630.0);
        let charge_bt: f64 = rng.gen_range(150.0..175.0);
        let fc_bt: f64 = rng.gen_range((target_c - 2.0)..(target_c + 4.0));
        let tau: f64 = rng.gen_range(70.0..140.0);
        let noise: Vec<f64> = (0..cfg.samples_per_roast)
            .map(|_| noise_dist.sample(&mut rng))
            .collect();
        let mut times: Vec<f64> = (0..cfg.samples_per_roast)
            .map(|_| rng.gen_range(30.0..fc_time * 0.96))
            .collect();
        times.sort_by(f64::total_cmp);

        for (t, eps) in times.into_iter().zip(noise) {
            let bt = fc_bt - (fc_bt - charge_bt) * (-t / tau).exp() + eps;
            let ror = ((fc_bt - bt) / (fc_time - t).max(1e-3) * 60.0).clamp(2.0, 24.0);
            rows.push(features(t, bt, ror));
            labels.push(fc_time - t);
        }
    }
    least_squares(&rows, &labels)
        .ok_or_else(|| RoastError::State("bootstrap fit failed".into()))
}

#[derive(Debug, Clone)]
pub struct MilestonePredictor {
    cfg: PredictorCfg,
    target_c: f64,
    weights: Weights,
    observations: RingBuffer<(f64, Features)>,
    last: Option<Prediction>,
}

impl MilestonePredictor {
    pub fn new(target_c: f64, cfg: PredictorCfg) -> Result<Self, RoastError> {
        if !target_c.is_finite() {
            return Err(RoastError::Config("milestone target must be finite".into()));
        }
        let weights = bootstrap_weights(target_c, &cfg)?;
        tracing::debug!(target_c, ?weights, "milestone predictor bootstrapped");
        Ok(Self {
            observations: RingBuffer::new(cfg.capacity),
            cfg,
            target_c,
            weights,
            last: None,
        })
    }

    pub fn target_c(&self) -> f64 {
        self.target_c
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    pub fn pending(&self) -> usize {
        self.observations.len()
    }

    pub fn last_prediction(&self) -> Option<Prediction> {
        self.last
    }

    fn predict(&self, f: &Features) -> f64 {
        let raw: f64 = self.weights.iter().zip(f).map(|(w, x)| w * x).sum();
        raw.clamp(0.0, self.cfg.max_remaining_s)
    }

    /// Predict from a live observation, optionally buffering it for recalibration.
    /// Non-finite inputs leave the previous prediction in place.
    pub fn observe(&mut self, t: f64, bt: f64, ror: f64, capture: bool) -> Option<Prediction> {
        if !(t.is_finite() && bt.is_finite() && ror.is_finite()) {
            return self.last;
        }
        let f = features(t, bt, ror);
        let remaining_s = self.predict(&f);
        let p = Prediction {
            at_s: t + remaining_s,
            remaining_s,
        };
        self.last = Some(p);
        if capture {
            self.observations.push((t, f));
        }
        self.last
    }

    /// The milestone happened at `t_fc`: refit on the relabelled buffer and blend.
    pub fn commit_first_crack(&mut self, t_fc: f64) {
        if !self.observations.is_empty() {
            let (rows, labels): (Vec<Features>, Vec<f64>) = self
                .observations
                .iter()
                .map(|(t, f)| (*f, (t_fc - t).max(0.0)))
                .unzip();
            match least_squares(&rows, &labels) {
                Some(fresh) => {
                    let k = self.cfg.blend_new;
                    for (w, n) in self.weights.iter_mut().zip(fresh) {
                        *w = (1.0 - k) * *w + k * n;
                    }
                    tracing::info!(t_fc, samples = rows.len(), "predictor recalibrated");
                }
                None => {
                    tracing::warn!(t_fc, samples = rows.len(), "recalibration fit failed, keeping weights");
                }
            }
            self.observations.clear();
        }
        self.last = Some(Prediction {
            at_s: t_fc,
            remaining_s: 0.0,
        });
    }

    /// Retarget; a material change re-runs the bootstrap and drops recalibration state.
    pub fn set_target_bt(&mut self, target_c: f64) -> Result<(), RoastError> {
        if !target_c.is_finite() {
            return Err(RoastError::Config("milestone target must be finite".into()));
        }
        if (target_c - self.target_c).abs() <= TARGET_TOLERANCE_C {
            self.target_c = target_c;
            return Ok(());
        }
        self.weights = bootstrap_weights(target_c, &self.cfg)?;
        self.target_c = target_c;
        self.reset();
        tracing::debug!(target_c, "milestone predictor retargeted");
        Ok(())
    }

    pub fn reset(&mut self) {
        self.observations.clear();
        self.last = None;
    }
}
