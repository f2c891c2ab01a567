//! Raw probe reading → calibrated Celsius.
use serde::Serialize;

use crate::error::RoastError;

#[inline]
pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

#[inline]
pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Unit conversion (optional) followed by the affine calibration.
/// Non-finite input stays non-finite; callers check.
#[inline]
pub fn condition(raw: f64, offset_c: f64, scale_pct: f64, input_is_fahrenheit: bool) -> f64 {
    let c = if input_is_fahrenheit {
        fahrenheit_to_celsius(raw)
    } else {
        raw
    };
    c * (scale_pct / 100.0) + offset_c
}

/// Affine probe calibration: `calibrated = raw * scale_pct / 100 + offset_c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    pub offset_c: f64,
    pub scale_pct: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            offset_c: 0.0,
            scale_pct: 100.0,
        }
    }
}

impl Calibration {
    pub fn new(offset_c: f64, scale_pct: f64) -> Result<Self, RoastError> {
        if !(offset_c.is_finite() && scale_pct.is_finite()) {
            return Err(RoastError::Calibration(
                "offset and scale must be finite".into(),
            ));
        }
        if scale_pct == 0.0 {
            return Err(RoastError::Calibration("scale_pct must be non-zero".into()));
        }
        Ok(Self {
            offset_c,
            scale_pct,
        })
    }

    #[inline]
    pub fn apply(&self, raw: f64, input_is_fahrenheit: bool) -> f64 {
        condition(raw, self.offset_c, self.scale_pct, input_is_fahrenheit)
    }

    /// Single reference point: scale resets to 100 % and the offset absorbs the error.
    /// `raw_c` is the probe reading already in Celsius.
    pub fn one_point(actual_c: f64, raw_c: f64) -> Result<Self, RoastError> {
        if !(actual_c.is_finite() && raw_c.is_finite()) {
            return Err(RoastError::Calibration(
                "one-point calibration needs a finite reference and reading".into(),
            ));
        }
        Ok(Self {
            offset_c: actual_c - raw_c,
            scale_pct: 100.0,
        })
    }

    /// Two reference points `(actual, raw)`; both readings in Celsius.
    pub fn two_point(p1: (f64, f64), p2: (f64, f64)) -> Result<Self, RoastError> {
        let (a1, r1) = p1;
        let (a2, r2) = p2;
        if ![a1, r1, a2, r2].iter().all(|v| v.is_finite()) {
            return Err(RoastError::Calibration(
                "two-point calibration needs finite references and readings".into(),
            ));
        }
        if (r2 - r1).abs() < 1e-9 {
            return Err(RoastError::Calibration(
                "two-point calibration needs distinct raw readings".into(),
            ));
        }
        let scale = (a2 - a1) / (r2 - r1);
        if scale == 0.0 || !scale.is_finite() {
            return Err(RoastError::Calibration(
                "two-point calibration produced a zero scale".into(),
            ));
        }
        Ok(Self {
            offset_c: a1 - scale * r1,
            scale_pct: scale * 100.0,
        })
    }
}
