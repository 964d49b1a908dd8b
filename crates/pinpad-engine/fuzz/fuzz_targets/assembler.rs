#![no_main]

use libfuzzer_sys::fuzz_target;
use pinpad_engine::{InputAssembler, INPUT_MAX_LEN};

fuzz_target!(|data: &[u8]| {
    // First byte picks the chunk size; the rest is delivered in chunks,
    // polling after each one like the session tick does.
    let Some((&size, rest)) = data.split_first() else {
        return;
    };
    let size = usize::from(size).max(1);

    let asm = InputAssembler::new();
    for chunk in rest.chunks(size) {
        asm.on_chunk(chunk);
        if let Some(message) = asm.poll() {
            assert!(message.len() < INPUT_MAX_LEN);
            assert_eq!(asm.buffered_len(), 0);
        }
        assert!(asm.buffered_len() <= INPUT_MAX_LEN.saturating_add(size));
    }
});
