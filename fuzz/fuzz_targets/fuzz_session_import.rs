#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Exported session files come back from disk; malformed rows must error, not panic.
    let _ = roast_config::session::read_samples_csv(data);
    let _ = roast_config::session::read_events_csv(data);
});
