#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Header-only probe and full decode; must never panic
    let _ = dibdec::probe(data);
    let _ = dibdec::decode(data, enough::Unstoppable);
});
