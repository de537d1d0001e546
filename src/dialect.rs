//! Tag dialects, schema generations and dialect detection.
//!
//! ONIX feeds come in two tag sets:
//! - **Reference**: verbose element names (`<ONIXMessage>`, `<Product>`, `<RecordReference>`)
//! - **Short**: compact element names (`<ONIXmessage>`, `<product>`, `<a001>`)
//!
//! The dialect is detected by sniffing a fixed-size prefix of the source for the
//! reference message tag. A full parse is not needed because the root element
//! always appears within the first few hundred bytes.

use crate::error::{OnixError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Root message tag in the reference dialect.
pub const REFERENCE_MESSAGE_TAG: &str = "ONIXMessage";
/// Root message tag in the short dialect.
pub const SHORT_MESSAGE_TAG: &str = "ONIXmessage";
/// Header tag in the reference dialect.
pub const REFERENCE_HEADER_TAG: &str = "Header";
/// Header tag in the short dialect.
pub const SHORT_HEADER_TAG: &str = "header";
/// Product tag in the reference dialect.
pub const REFERENCE_PRODUCT_TAG: &str = "Product";
/// Product tag in the short dialect.
pub const SHORT_PRODUCT_TAG: &str = "product";

/// Prefix length sniffed when the whole document is parsed.
pub const DOCUMENT_SNIFF_LENGTH: usize = 500;
/// Prefix length sniffed by the forward-streaming strategy.
pub const STREAMING_SNIFF_LENGTH: usize = 512;

/// Tag set used by a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TagDialect {
    /// Verbose reference tag names
    #[default]
    Reference,
    /// Compact short tag names
    Short,
}

impl TagDialect {
    /// Root message tag for this dialect.
    #[must_use]
    pub fn message_tag(self) -> &'static str {
        self.resolve(REFERENCE_MESSAGE_TAG, SHORT_MESSAGE_TAG)
    }

    /// Header tag for this dialect.
    #[must_use]
    pub fn header_tag(self) -> &'static str {
        self.resolve(REFERENCE_HEADER_TAG, SHORT_HEADER_TAG)
    }

    /// Product tag for this dialect.
    #[must_use]
    pub fn product_tag(self) -> &'static str {
        self.resolve(REFERENCE_PRODUCT_TAG, SHORT_PRODUCT_TAG)
    }

    /// Pick the wire name matching this dialect.
    #[must_use]
    pub fn resolve<'a>(self, reference: &'a str, short: &'a str) -> &'a str {
        match self {
            TagDialect::Reference => reference,
            TagDialect::Short => short,
        }
    }

    /// Whether this is the reference dialect.
    #[must_use]
    pub fn is_reference(self) -> bool {
        self == TagDialect::Reference
    }
}

/// Structural version of the ONIX format.
///
/// Not detected: the caller picks it by choosing a parser type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaGeneration {
    /// ONIX 2.1 and earlier
    Legacy,
    /// ONIX 3.0
    Current,
}

/// Strategy used to load and enumerate a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParseMode {
    /// Decode the whole message eagerly at construction time
    FullLoad,
    /// Load the document once, then decode products one at a time by index
    #[default]
    WindowedDom,
    /// Never hold more than one product's markup in memory
    ForwardStreaming,
}

impl ParseMode {
    /// Minimum number of bytes sniffed for dialect detection in this mode.
    #[must_use]
    pub fn sniff_length(self) -> usize {
        match self {
            ParseMode::FullLoad | ParseMode::WindowedDom => DOCUMENT_SNIFF_LENGTH,
            ParseMode::ForwardStreaming => STREAMING_SNIFF_LENGTH,
        }
    }
}

/// Detect the dialect from a prefix of the raw source.
///
/// Only the first `required` bytes are inspected.
///
/// # Errors
///
/// Returns [`OnixError::SourceTooSmall`] if `head` is shorter than `required`.
///
/// # Examples
///
/// ```
/// use onix_feed::dialect::{detect_dialect, TagDialect};
///
/// let mut head = String::from("<?xml version=\"1.0\"?><ONIXmessage release=\"3.0\">");
/// head.push_str(&" ".repeat(500));
/// assert_eq!(detect_dialect(head.as_bytes(), 500)?, TagDialect::Short);
/// # Ok::<(), onix_feed::OnixError>(())
/// ```
pub fn detect_dialect(head: &[u8], required: usize) -> Result<TagDialect> {
    if head.len() < required {
        return Err(OnixError::SourceTooSmall {
            required,
            actual: head.len(),
        });
    }

    let needle = format!("<{REFERENCE_MESSAGE_TAG}");
    let window = &head[..required];
    if memchr::memmem::find(window, needle.as_bytes()).is_some() {
        Ok(TagDialect::Reference)
    } else {
        Ok(TagDialect::Short)
    }
}

/// Detect the dialect of an in-memory feed.
///
/// # Errors
///
/// Returns [`OnixError::SourceTooSmall`] if the text is shorter than `required` bytes.
pub fn detect_text_dialect(text: &str, required: usize) -> Result<TagDialect> {
    detect_dialect(text.as_bytes(), required)
}

/// Detect the dialect of a feed file by reading its first `required` bytes.
///
/// # Errors
///
/// Returns [`OnixError::SourceTooSmall`] if the file is shorter than `required`
/// bytes, or an I/O error if it cannot be read.
pub fn detect_file_dialect(path: &Path, required: usize) -> Result<TagDialect> {
    let file = File::open(path)?;
    let length = file.metadata()?.len();
    if length < required as u64 {
        return Err(OnixError::SourceTooSmall {
            required,
            actual: usize::try_from(length).unwrap_or(usize::MAX),
        });
    }

    let mut head = Vec::with_capacity(required);
    file.take(required as u64).read_to_end(&mut head)?;
    detect_dialect(&head, required)
}
