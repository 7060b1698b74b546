#![no_main]

use aseload_utils::{compression::inflate_zlib, testing::compress_zlib};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let compressed = compress_zlib(data);
    if data.is_empty() {
        return;
    }

    let inflated = inflate_zlib(&compressed, data.len()).unwrap();
    assert_eq!(data, &*inflated);
    assert!(inflate_zlib(&compressed, data.len() - 1).is_err());
});
