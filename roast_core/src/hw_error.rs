//! Maps `Box<dyn Error>` from the probe trait boundary to a typed `RoastError`.
//!
//! `roast_traits` uses `Box<dyn Error + Send + Sync>`; this module converts
//! those for logging, with an optional feature-gated path for
//! `roast_hardware::HwError` downcasting.

use crate::error::RoastError;

/// Map a probe error to a typed `RoastError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to the error's message.
pub fn map_probe_error(e: &(dyn std::error::Error + 'static)) -> RoastError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<roast_hardware::error::HwError>() {
            return match hw {
                roast_hardware::error::HwError::Timeout => {
                    RoastError::Sensor("probe read timeout".into())
                }
                roast_hardware::error::HwError::Io(io) => RoastError::Io(io.to_string()),
                other => RoastError::Sensor(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        return RoastError::Io(io.to_string());
    }
    RoastError::Sensor(e.to_string())
}
