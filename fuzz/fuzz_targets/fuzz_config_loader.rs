#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must parse-or-error without panicking, and a parsed
    // config must survive validation.
    if let Ok(cfg) = toml::from_str::<wheel_config::Config>(data) {
        let _ = cfg.validate();
    }
});
