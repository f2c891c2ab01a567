//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use roast_core::error::{BuildError, RoastError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML or calibration file.\nHow to fix: Edit the config file, then rerun. See etc/roast_config.toml for a sample."
            ),
        };
    }

    if let Some(re) = err.downcast_ref::<RoastError>() {
        return match re {
            RoastError::Sensor(_) => "What happened: The temperature probe did not answer.\nLikely causes: Probe disconnected, wrong source selected, or read timeout too low.\nHow to fix: Check the probe connection and consider increasing sensor.read_timeout_ms in the config.".to_string(),
            RoastError::Calibration(msg) => format!(
                "What happened: Calibration rejected ({msg}).\nLikely causes: Identical or non-finite reference readings.\nHow to fix: Take reference readings at two clearly different temperatures and try again."
            ),
            RoastError::Config(msg) => format!(
                "What happened: Invalid setting ({msg}).\nLikely causes: A profile or command value outside its allowed range.\nHow to fix: Correct the value in the config or profiles file."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config and file parsing
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("must be") && (lower.contains('.') || lower.contains("config")) {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("toml parse error") || lower.contains("parse config") {
        return format!(
            "What happened: The config file could not be parsed.\nLikely causes: A typo or a value of the wrong type.\nHow to fix: Fix the TOML syntax and rerun. Details: {msg}"
        );
    }

    if lower.contains("no such file") || lower.contains("open ") {
        return format!(
            "What happened: A file could not be opened.\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check the path and rerun. Details: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error kind; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use roast_core::error::{BuildError, RoastError};
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<RoastError>() {
        Some(RoastError::Config(_)) => 2,
        Some(RoastError::Calibration(_)) => 3,
        Some(RoastError::Sensor(_)) => 4,
        Some(RoastError::Io(_)) => 5,
        _ => 1,
    }
}

/// Short stable name for the error kind, used in JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    use roast_core::error::{BuildError, RoastError};
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<RoastError>() {
        Some(RoastError::Config(_)) => "Config",
        Some(RoastError::Calibration(_)) => "Calibration",
        Some(RoastError::Sensor(_)) => "Sensor",
        Some(RoastError::ClockRegression { .. }) => "ClockRegression",
        Some(RoastError::State(_)) => "State",
        Some(RoastError::Io(_)) => "Io",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": reason_name(err),
        "code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
