//! Run state and sensor freshness classification.
use serde::Serialize;

use crate::sampler::SensorSnapshot;

/// Whether ticks are recorded into the session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
}

/// Freshness of the latest probe reading as seen by the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorStatus {
    /// Valid, finite and recent.
    Ok,
    /// Valid and finite but older than the freshness threshold.
    Late,
    /// No reading, or the last read failed.
    NoData,
}

/// Readings older than this are late: three sample periods, never under 1.5 s.
#[inline]
pub fn freshness_threshold_s(sample_dt: f64) -> f64 {
    (3.0 * sample_dt).max(1.5)
}

impl SensorStatus {
    pub fn classify(snapshot: Option<&SensorSnapshot>, now_s: f64, sample_dt: f64) -> Self {
        let Some(s) = snapshot else {
            return SensorStatus::NoData;
        };
        if !(s.is_valid && s.raw_value.is_finite()) {
            return SensorStatus::NoData;
        }
        let age = now_s - s.last_update_s;
        if age < freshness_threshold_s(sample_dt) {
            SensorStatus::Ok
        } else {
            SensorStatus::Late
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SensorStatus::Ok => "data ok",
            SensorStatus::Late => "reading late",
            SensorStatus::NoData => "no data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(v: f64, valid: bool, at: f64) -> SensorSnapshot {
        SensorSnapshot {
            raw_value: v,
            is_valid: valid,
            last_update_s: at,
            source_label: "test",
        }
    }

    #[test]
    fn threshold_has_floor() {
        assert_eq!(freshness_threshold_s(0.1), 1.5);
        assert_eq!(freshness_threshold_s(1.0), 3.0);
    }

    #[test]
    fn classify_cases() {
        let dt = 0.5;
        assert_eq!(SensorStatus::classify(None, 1.0, dt), SensorStatus::NoData);
        assert_eq!(
            SensorStatus::classify(Some(&snap(20.0, true, 10.0)), 11.0, dt),
            SensorStatus::Ok
        );
        assert_eq!(
            SensorStatus::classify(Some(&snap(20.0, true, 10.0)), 11.6, dt),
            SensorStatus::Late
        );
        assert_eq!(
            SensorStatus::classify(Some(&snap(f64::NAN, true, 10.0)), 10.0, dt),
            SensorStatus::NoData
        );
        assert_eq!(
            SensorStatus::classify(Some(&snap(20.0, false, 10.0)), 10.0, dt),
            SensorStatus::NoData
        );
    }
}
