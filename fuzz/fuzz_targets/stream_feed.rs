#![no_main]

use libfuzzer_sys::fuzz_target;
use onix_feed::{DecoderRegistry, OnixParser, ParseMode, ParserOptions, TagDialect};
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data).into_owned();
    let options = ParserOptions::default()
        .with_mode(ParseMode::ForwardStreaming)
        .with_dialect(TagDialect::Reference);
    let Ok(parser) = OnixParser::from_text(text, Arc::new(DecoderRegistry::new()), options) else {
        return;
    };
    for record in parser.records() {
        if record.is_err() {
            break;
        }
    }
});
