#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let options = aseload::DecodeOptions::default().with_max_inflated_size(1 << 20);
    if let Ok(document) = aseload::Document::parse(data, options.parse_options()) {
        let first = aseload::assemble(&document, options.assembly_options());
        let second = aseload::assemble(&document, options.assembly_options());
        assert_eq!(first.ok(), second.ok());
    }
});
