//! Whole-document loading for the windowed strategies.
//!
//! A [`FeedDocument`] holds the complete feed text. [`FeedDocument::elements_by_tag_name`]
//! tokenizes it once and returns a [`NodeList`] of byte spans, one per matching
//! element, so each record can later be served as the exact outer markup slice of
//! the original text.

use crate::error::{OnixError, Result};
use crate::reader::{FeedSource, SharedText};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::ops::Range;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// A fully loaded feed.
#[derive(Debug, Clone)]
pub struct FeedDocument {
    text: SharedText,
}

impl FeedDocument {
    /// Load the whole source into memory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or
    /// [`OnixError::EncodingError`] if it is not valid UTF-8.
    pub fn load(source: &FeedSource) -> Result<Self> {
        Ok(FeedDocument {
            text: source.read_to_text()?,
        })
    }

    /// The document text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Locate every element whose local name is `tag`, in document order.
    ///
    /// Elements nested inside a match are not reported separately. End tag
    /// names are not checked, so a record with broken nesting still yields one
    /// span and fails later, on its own, when decoded.
    ///
    /// # Errors
    ///
    /// Returns [`OnixError::XmlError`] if the document cannot be tokenized.
    pub fn elements_by_tag_name(&self, tag: &str) -> Result<NodeList> {
        let text: &str = &self.text;
        // Spans index the full text; the tokenizer only sees what follows the BOM
        let body = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
        let offset = text.len() - body.len();
        let bytes = body.as_bytes();
        let mut reader = Reader::from_str(body);
        reader.check_end_names(false);

        let xml_error = |position: usize, e: quick_xml::Error| {
            OnixError::XmlError(format!("at byte {}: {e}", offset + position))
        };
        let mut spans = Vec::new();

        loop {
            let before = reader.buffer_position();
            let event = reader.read_event().map_err(|e| xml_error(before, e))?;
            match event {
                Event::Start(start) if start.local_name().as_ref() == tag.as_bytes() => {
                    let open = tag_start(bytes, before, reader.buffer_position());
                    reader
                        .read_to_end(start.name())
                        .map_err(|e| xml_error(open, e))?;
                    spans.push(offset + open..offset + reader.buffer_position());
                },
                Event::Empty(start) if start.local_name().as_ref() == tag.as_bytes() => {
                    let open = tag_start(bytes, before, reader.buffer_position());
                    spans.push(offset + open..offset + reader.buffer_position());
                },
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(NodeList {
            text: self.text.clone(),
            spans,
        })
    }
}

/// Offset of the `<` opening the tag that ends at `end`.
fn tag_start(bytes: &[u8], fallback: usize, end: usize) -> usize {
    memchr::memrchr(b'<', &bytes[..end]).unwrap_or(fallback)
}

/// Elements selected from a [`FeedDocument`], addressed by index.
#[derive(Debug, Clone)]
pub struct NodeList {
    text: SharedText,
    spans: Vec<Range<usize>>,
}

impl NodeList {
    /// Number of selected elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether nothing was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Exact outer markup of the element at `index`.
    #[must_use]
    pub fn outer_xml(&self, index: usize) -> Option<&str> {
        let span = self.spans.get(index)?;
        self.text.get(span.clone())
    }

    /// Byte span of the element at `index`.
    #[must_use]
    pub fn span(&self, index: usize) -> Option<Range<usize>> {
        self.spans.get(index).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(text: &str) -> FeedDocument {
        FeedDocument::load(&FeedSource::from_text(text).unwrap()).unwrap()
    }

    #[test]
    fn test_outer_xml_is_exact() {
        let text = "<ONIXmessage>\n<header><m183>n</m183></header>\n\
                    <product>\n  <a001>1</a001>\n</product>\n<product a=\"x\"><a001>2</a001></product>\n\
                    <product/>\n</ONIXmessage>";
        let nodes = document(text).elements_by_tag_name("product").unwrap();

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes.outer_xml(0), Some("<product>\n  <a001>1</a001>\n</product>"));
        assert_eq!(nodes.outer_xml(1), Some("<product a=\"x\"><a001>2</a001></product>"));
        assert_eq!(nodes.outer_xml(2), Some("<product/>"));
        assert_eq!(nodes.outer_xml(3), None);
    }

    #[test]
    fn test_tag_names_are_case_sensitive() {
        let nodes = document("<ONIXMessage><Product/></ONIXMessage>")
            .elements_by_tag_name("product")
            .unwrap();
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_broken_nesting_stays_inside_span() {
        let text = "<m><Product><A>1</B></Product><Product><A>2</A></Product></m>";
        let nodes = document(text).elements_by_tag_name("Product").unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes.outer_xml(0), Some("<Product><A>1</B></Product>"));
        assert_eq!(nodes.span(1), Some(30..57));
    }

    #[test]
    fn test_spans_account_for_byte_order_mark() {
        let text = "\u{feff}<m>\n<p>1</p>\n<p><q/></p>\n</m>";
        let nodes = document(text).elements_by_tag_name("p").unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes.outer_xml(0), Some("<p>1</p>"));
        assert_eq!(nodes.outer_xml(1), Some("<p><q/></p>"));
        assert_eq!(nodes.span(0), Some(7..15));
    }

    #[test]
    fn test_unterminated_element_is_fatal() {
        let err = document("<m><Product><A>1</A>").elements_by_tag_name("Product").unwrap_err();
        assert!(matches!(err, OnixError::XmlError(_)));
    }
}
