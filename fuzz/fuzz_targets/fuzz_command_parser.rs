#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Any line of text must either parse into a command or return a
    // structured error; panics are bugs.
    for line in data.lines() {
        let _ = wheel_core::command::parse(line);
    }
});
