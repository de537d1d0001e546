#![no_main]

use libfuzzer_sys::fuzz_target;
use onix_feed::schema::legacy::LegacyProduct;
use onix_feed::{TagDialect, XmlDecoder};

fuzz_target!(|data: &[u8]| {
    let Ok(xml) = std::str::from_utf8(data) else {
        return;
    };
    let decoder = XmlDecoder::<LegacyProduct>::new(TagDialect::Reference, "Product");
    let mut fragments = 0usize;
    let _ = decoder.decode_with(xml, |_| fragments += 1);
});
