//! Burner/airflow advice from the current RoR against a target curve.
use serde::Serialize;
use std::fmt;

use roast_config::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Advice {
    LowerBurner,
    RaiseBurner,
    Hold,
    Unavailable,
}

impl Advice {
    pub fn text(self) -> &'static str {
        match self {
            Advice::LowerBurner => "lower burner, raise airflow",
            Advice::RaiseBurner => "raise burner, lower airflow",
            Advice::Hold => "hold",
            Advice::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Compare `current_rate` with `target_rate` using a symmetric dead band.
pub fn suggest(current_rate: f64, target_rate: f64, tolerance: f64) -> Advice {
    if !(current_rate.is_finite() && target_rate.is_finite()) {
        return Advice::Unavailable;
    }
    if current_rate > target_rate + tolerance {
        Advice::LowerBurner
    } else if current_rate < target_rate - tolerance {
        Advice::RaiseBurner
    } else {
        Advice::Hold
    }
}

/// Piecewise-linear interpolation over points sorted by time, clamped at both ends.
/// Coincident times take the earlier point's value.
pub fn interpolate(points: &[(f64, f64)], t: f64) -> f64 {
    let Some(&(_, first_v)) = points.first() else {
        return f64::NAN;
    };
    let i = points.partition_point(|(pt, _)| *pt <= t);
    if i == 0 {
        return first_v;
    }
    if i >= points.len() {
        return points[points.len() - 1].1;
    }
    let (t0, v0) = points[i - 1];
    let (t1, v1) = points[i];
    let frac = if t1 == t0 { 0.0 } else { (t - t0) / (t1 - t0) };
    v0 + frac * (v1 - v0)
}

/// Lowest target the shaped curve will ask for (°C/min).
const SHAPED_FLOOR: f64 = 0.5;

/// Target RoR over the course of a roast.
#[derive(Debug, Clone, PartialEq)]
pub enum RorTarget {
    Constant(f64),
    /// Explicit `(t_sec, ror)` points, kept sorted by time.
    Curve(Vec<(f64, f64)>),
    /// Declining curve anchored on the forecast first-crack and drop times.
    Shaped {
        start: f64,
        first_crack: f64,
        end: f64,
    },
}

impl Default for RorTarget {
    fn default() -> Self {
        RorTarget::Constant(7.0)
    }
}

impl RorTarget {
    /// Build a curve target, dropping non-finite points. Empty input falls back to `fallback`.
    pub fn curve(points: impl IntoIterator<Item = (f64, f64)>, fallback: f64) -> Self {
        let mut pts: Vec<(f64, f64)> = points
            .into_iter()
            .filter(|(t, v)| t.is_finite() && v.is_finite())
            .collect();
        if pts.is_empty() {
            return RorTarget::Constant(fallback);
        }
        pts.sort_by(|a, b| a.0.total_cmp(&b.0));
        RorTarget::Curve(pts)
    }

    /// Shaped target from a start value; missing anchors use the usual fractions of it.
    pub fn shaped(start: f64, first_crack: Option<f64>, end: Option<f64>) -> Self {
        RorTarget::Shaped {
            start,
            first_crack: first_crack.unwrap_or_else(|| (0.7 * start).max(4.5)),
            end: end.unwrap_or_else(|| (0.55 * start).max(3.5)),
        }
    }

    /// A profile with an explicit curve uses it; otherwise the shaped curve
    /// starting at `rorTargetStart` (or `rorTarget`).
    pub fn from_profile(p: &Profile) -> Self {
        match &p.ror_curve {
            Some(curve) if !curve.is_empty() => {
                Self::curve(curve.iter().map(|pt| (pt.t, pt.v)), p.ror_target)
            }
            _ => Self::shaped(
                p.ror_target_start.unwrap_or(p.ror_target),
                p.ror_target_first_crack,
                p.ror_target_end,
            ),
        }
    }

    /// Anchor points of the shaped curve for a roast at `now_s`.
    pub fn shaped_points(
        start: f64,
        first_crack: f64,
        end: f64,
        now_s: f64,
        eta_fc_s: Option<f64>,
        eta_drop_s: Option<f64>,
    ) -> [(f64, f64); 4] {
        let fc_t = eta_fc_s.map_or(now_s + 240.0, |eta| now_s + eta);
        let mut drop_t = eta_drop_s.map_or(fc_t + 180.0, |eta| now_s + eta);
        if drop_t <= fc_t {
            drop_t = fc_t + 120.0;
        }
        [
            (0.0, start),
            ((fc_t - 180.0).max(0.0), (start + first_crack) / 2.0),
            (fc_t, first_crack),
            (drop_t, end),
        ]
        .map(|(t, v)| (t, v.max(SHAPED_FLOOR)))
    }

    /// Target RoR at session time `now_s`, given the current forecasts.
    pub fn at(&self, now_s: f64, eta_fc_s: Option<f64>, eta_drop_s: Option<f64>) -> f64 {
        match self {
            RorTarget::Constant(v) => *v,
            RorTarget::Curve(points) => interpolate(points, now_s),
            RorTarget::Shaped {
                start,
                first_crack,
                end,
            } => {
                let pts =
                    Self::shaped_points(*start, *first_crack, *end, now_s, eta_fc_s, eta_drop_s);
                interpolate(&pts, now_s)
            }
        }
    }
}
