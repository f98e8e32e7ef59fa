#![no_main]

use libfuzzer_sys::fuzz_target;
use lidy::{compile_grammar, CompileOptions, Loader, ValidateOptions};

const DOCUMENT: &str = "name: x\nitems: [1, 2.5, true, ~]\n";

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(grammar) = compile_grammar(s, &CompileOptions::default()) {
            if let Ok(document) = Loader::new().load(DOCUMENT) {
                let options = ValidateOptions { max_depth: 64 };
                for (name, _) in grammar.rules() {
                    let _ = grammar.validate(name, &document, &options);
                }
            }
        }
    }
});
