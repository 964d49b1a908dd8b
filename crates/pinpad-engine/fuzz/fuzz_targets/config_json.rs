#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Must never panic on arbitrary input
    let _ = pinpad_engine::PinpadConfig::from_json(data);
});
