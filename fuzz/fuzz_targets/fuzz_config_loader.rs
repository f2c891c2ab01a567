#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validate errors are fine; panics are not.
    if let Ok(cfg) = roast_config::load_toml(data) {
        let _ = cfg.validate();
        let _ = cfg.sample_dt();
    }
    if let Ok(profiles) = roast_config::parse_profiles(data) {
        for by_target in profiles.0.values() {
            for p in by_target.values() {
                let _ = p.validate();
            }
        }
    }
});
