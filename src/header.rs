//! Header extraction.
//!
//! The header is located by an independent forward-only scan of the source, so
//! it is available before the first record is read. Full loads take the header
//! from the decoded message instead and never call into this module.

use crate::dialect::TagDialect;
use crate::error::{OnixError, Result};
use crate::reader::{ElementScan, FeedSource};
use crate::registry::DecoderRegistry;
use crate::schema::OnixRecord;
use tracing::{debug, warn};

/// Nodes read before a bounded header scan gives up.
pub const HEADER_SCAN_NODE_LIMIT: usize = 100;

/// Scan `source` for the dialect's header element and decode it.
///
/// The header decoder must already be registered. With `node_limit`, the scan
/// stops after that many nodes; a header that is not found yields
/// `H::default()`.
///
/// # Errors
///
/// Returns [`OnixError::MissingDecoder`](crate::OnixError::MissingDecoder) if no
/// header decoder is registered, [`OnixError::Decode`](crate::OnixError::Decode)
/// if the header is found but cannot be decoded, [`OnixError::XmlError`] if it
/// cannot be read to its end, or an I/O error.
pub fn extract_header<H: OnixRecord>(
    source: &FeedSource,
    dialect: TagDialect,
    registry: &DecoderRegistry,
    node_limit: Option<usize>,
) -> Result<H> {
    let tag = dialect.header_tag();
    let decoder = registry.get::<H>(tag)?;
    let mut reader = source.open()?;

    match reader.next_element(tag, node_limit)? {
        ElementScan::Found(markup) => {
            debug!(tag, bytes = markup.len(), "Found header");
            Ok(decoder.decode(&markup)?)
        },
        ElementScan::Malformed { reason, .. } => Err(OnixError::XmlError(format!(
            "<{tag}> could not be read: {reason}"
        ))),
        ElementScan::NotFound => {
            warn!(tag, ?node_limit, "No header found, using defaults");
            Ok(H::default())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::current::Header;
    use crate::schema::legacy::LegacyHeader;

    #[test]
    fn test_extract_short_header() {
        let registry = DecoderRegistry::new();
        registry.register::<Header>(TagDialect::Short, "header").unwrap();
        let source = FeedSource::from_text(
            "<ONIXmessage><header><sender><x298>Acme</x298></sender><m186>CAD</m186></header>\
             <product><a001>1</a001></product></ONIXmessage>",
        )
        .unwrap();

        let header: Header = extract_header(&source, TagDialect::Short, &registry, None).unwrap();
        assert_eq!(header.sender_name(), Some("Acme"));
        assert_eq!(header.default_currency_code.as_deref(), Some("CAD"));
    }

    #[test]
    fn test_missing_header_gives_default() {
        let registry = DecoderRegistry::new();
        registry.register::<LegacyHeader>(TagDialect::Reference, "Header").unwrap();
        let source = FeedSource::from_text("<ONIXMessage><Product/></ONIXMessage>").unwrap();

        let header: LegacyHeader =
            extract_header(&source, TagDialect::Reference, &registry, None).unwrap();
        assert_eq!(header, LegacyHeader::default());
    }

    #[test]
    fn test_bounded_scan_gives_up() {
        let registry = DecoderRegistry::new();
        registry.register::<Header>(TagDialect::Reference, "Header").unwrap();
        let mut text = String::from("<ONIXMessage>");
        for i in 0..HEADER_SCAN_NODE_LIMIT {
            text.push_str(&format!("<X>{i}</X>"));
        }
        text.push_str("<Header><MessageNote>late</MessageNote></Header></ONIXMessage>");
        let source = FeedSource::from_text(text).unwrap();

        let bounded: Header =
            extract_header(&source, TagDialect::Reference, &registry, Some(HEADER_SCAN_NODE_LIMIT))
                .unwrap();
        assert_eq!(bounded, Header::default());

        let unbounded: Header =
            extract_header(&source, TagDialect::Reference, &registry, None).unwrap();
        assert_eq!(unbounded.message_note.as_deref(), Some("late"));
    }

    #[test]
    fn test_unregistered_header_decoder() {
        let registry = DecoderRegistry::new();
        let source = FeedSource::from_text("<ONIXMessage/>").unwrap();
        let err =
            extract_header::<Header>(&source, TagDialect::Reference, &registry, None).unwrap_err();
        assert!(matches!(err, OnixError::MissingDecoder { .. }));
    }

    #[test]
    fn test_undecodable_header_is_fatal() {
        let registry = DecoderRegistry::new();
        registry.register::<Header>(TagDialect::Reference, "Header").unwrap();
        let source =
            FeedSource::from_text("<ONIXMessage><Header><A>1</B></Header></ONIXMessage>").unwrap();
        let err =
            extract_header::<Header>(&source, TagDialect::Reference, &registry, None).unwrap_err();
        assert!(matches!(err, OnixError::Decode(_)));
    }
}
