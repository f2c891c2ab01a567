//! Common time/period helpers for roast_core.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;
/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Lowest sampling rate accepted by the period helpers.
const MIN_HZ: f64 = 0.1;

fn clamp_hz(hz: f64) -> f64 {
    if hz.is_finite() { hz.max(MIN_HZ) } else { MIN_HZ }
}

/// Period in seconds for a sampling rate in Hz.
/// Non-finite or tiny rates are clamped to 0.1 Hz.
#[inline]
pub fn period_secs(hz: f64) -> f64 {
    1.0 / clamp_hz(hz)
}

/// Period in microseconds for a sampling rate in Hz; at least 1 µs.
#[inline]
pub fn period_us(hz: f64) -> u64 {
    ((MICROS_PER_SEC as f64 / clamp_hz(hz)).round() as u64).max(1)
}

/// Period in milliseconds for a sampling rate in Hz; at least 1 ms.
#[inline]
pub fn period_ms(hz: f64) -> u64 {
    ((MILLIS_PER_SEC as f64 / clamp_hz(hz)).round() as u64).max(1)
}

/// Mean of the finite values, or NaN when there are none.
pub fn nan_mean<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Median of a slice (even counts average the middle pair); NaN when empty.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        (v[mid - 1] + v[mid]) / 2.0
    } else {
        v[mid]
    }
}
