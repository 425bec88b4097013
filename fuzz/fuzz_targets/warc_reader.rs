#![no_main]

use libfuzzer_sys::fuzz_target;

use warcsift::extractor::normalize;
use warcsift::warc::WarcReader;

fuzz_target!(|data: &[u8]| {
    // malformed framing must surface as an error, never a panic
    let mut reader = WarcReader::new(data);
    while let Ok(Some(record)) = reader.read_record() {
        let text = normalize(&String::from_utf8_lossy(&record.payload));
        assert!(!text.contains('\0'));
        assert_eq!(normalize(&text), text);
    }
});
