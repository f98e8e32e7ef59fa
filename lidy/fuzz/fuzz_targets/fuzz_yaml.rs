#![no_main]

use libfuzzer_sys::fuzz_target;
use lidy::validate_str;

const GRAMMAR: &str = "main: any\n";

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = validate_str(GRAMMAR, "main", s);
    }
});
