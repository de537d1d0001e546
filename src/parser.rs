//! Feed parsers.
//!
//! A [`FeedParser`] ties the pieces together for one feed:
//!
//! 1. detect the tag dialect from the head of the source (unless overridden),
//! 2. repair the source's encoding in place,
//! 3. register the decoders it needs in the shared [`DecoderRegistry`],
//! 4. decode the header, or the whole message for [`ParseMode::FullLoad`].
//!
//! Every step that can fail does so here, before iteration begins. Records are
//! then read with [`FeedParser::records`].
//!
//! # Examples
//!
//! ```no_run
//! use onix_feed::{DecoderRegistry, OnixParser, ParserOptions, ParseMode};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(DecoderRegistry::new());
//! let options = ParserOptions::default().with_mode(ParseMode::ForwardStreaming);
//! let parser = OnixParser::from_path("feed.xml", Arc::clone(&registry), options)?;
//!
//! println!("Sender: {:?}", parser.header().sender_name());
//! for record in &parser {
//!     let record = record?;
//!     match record.error() {
//!         None => println!("{}", record.product().record_reference),
//!         Some(error) => eprintln!("skipped: {error}"),
//!     }
//! }
//! # Ok::<(), onix_feed::OnixError>(())
//! ```

use crate::decoder::XmlDecoder;
use crate::dialect::{ParseMode, TagDialect};
use crate::encoding::NormalizeOptions;
use crate::enumerator::{FeedEnumerator, RecordOptions};
use crate::error::Result;
use crate::header::{extract_header, HEADER_SCAN_NODE_LIMIT};
use crate::message::FeedMessage;
use crate::reader::FeedSource;
use crate::record::FeedRecord;
use crate::registry::DecoderRegistry;
use crate::schema::{CurrentSchema, LegacySchema, Schema};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Parser for ONIX 3.0 feeds.
pub type OnixParser = FeedParser<CurrentSchema>;
/// Parser for ONIX 2.1 feeds.
pub type LegacyParser = FeedParser<LegacySchema>;

/// Options for opening a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Loading strategy
    pub mode: ParseMode,
    /// Tag dialect; detected from the source when `None`
    pub dialect: Option<TagDialect>,
    /// Repair the source's encoding before parsing
    pub preprocess: bool,
    /// Drop or escape content the repair cannot fix
    pub filter_bad_encodings: bool,
    /// Backfill unset product fields from the header
    pub apply_defaults: bool,
    /// Keep the source markup on successfully decoded records
    pub retain_input_xml: bool,
    /// Nodes to scan for the header; by default bounded only when streaming
    pub header_scan_limit: Option<usize>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            mode: ParseMode::default(),
            dialect: None,
            preprocess: true,
            filter_bad_encodings: false,
            apply_defaults: true,
            retain_input_xml: true,
            header_scan_limit: None,
        }
    }
}

impl ParserOptions {
    /// Set the loading strategy.
    #[must_use]
    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    /// Skip detection and use this dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: TagDialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Enable or disable encoding repair.
    #[must_use]
    pub fn with_preprocess(mut self, preprocess: bool) -> Self {
        self.preprocess = preprocess;
        self
    }

    /// Enable or disable filtering of unrepairable content.
    #[must_use]
    pub fn with_filter_bad_encodings(mut self, filter: bool) -> Self {
        self.filter_bad_encodings = filter;
        self
    }

    /// Enable or disable header defaults.
    #[must_use]
    pub fn with_apply_defaults(mut self, apply: bool) -> Self {
        self.apply_defaults = apply;
        self
    }

    /// Enable or disable keeping markup on decoded records.
    #[must_use]
    pub fn with_retain_input_xml(mut self, retain: bool) -> Self {
        self.retain_input_xml = retain;
        self
    }

    /// Bound the header scan to `limit` nodes.
    #[must_use]
    pub fn with_header_scan_limit(mut self, limit: usize) -> Self {
        self.header_scan_limit = Some(limit);
        self
    }

    /// Header scan bound in effect.
    #[must_use]
    pub fn effective_header_scan_limit(&self) -> Option<usize> {
        match (self.header_scan_limit, self.mode) {
            (Some(limit), _) => Some(limit),
            (None, ParseMode::ForwardStreaming) => Some(HEADER_SCAN_NODE_LIMIT),
            (None, _) => None,
        }
    }

    fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions::default()
            .with_filter(self.filter_bad_encodings)
            .with_parallel(self.mode == ParseMode::ForwardStreaming)
    }

    fn record_options(&self) -> RecordOptions {
        RecordOptions {
            apply_defaults: self.apply_defaults,
            retain_input_xml: self.retain_input_xml,
        }
    }
}

/// An opened feed of one schema generation.
pub struct FeedParser<S: Schema> {
    source: FeedSource,
    dialect: TagDialect,
    options: ParserOptions,
    registry: Arc<DecoderRegistry>,
    header: Arc<S::Header>,
    message: Option<FeedMessage<S::Header, S::Product>>,
}

impl<S: Schema> FeedParser<S> {
    /// Open a feed file.
    ///
    /// With preprocessing enabled the file may be rewritten in place.
    ///
    /// # Errors
    ///
    /// Returns [`OnixError::SourceNotFound`](crate::OnixError::SourceNotFound)
    /// if the file does not exist, plus everything [`from_source`](Self::from_source) returns.
    pub fn from_path(
        path: impl AsRef<Path>,
        registry: Arc<DecoderRegistry>,
        options: ParserOptions,
    ) -> Result<Self> {
        Self::from_source(FeedSource::from_path(path)?, registry, options)
    }

    /// Open an in-memory feed.
    ///
    /// # Errors
    ///
    /// Returns [`OnixError::EmptySource`](crate::OnixError::EmptySource) for empty
    /// text, plus everything [`from_source`](Self::from_source) returns.
    pub fn from_text(
        text: impl Into<String>,
        registry: Arc<DecoderRegistry>,
        options: ParserOptions,
    ) -> Result<Self> {
        Self::from_source(FeedSource::from_text(text)?, registry, options)
    }

    /// Open a feed from any source.
    ///
    /// # Errors
    ///
    /// Returns [`OnixError::SourceTooSmall`](crate::OnixError::SourceTooSmall) if
    /// the dialect must be detected and the source is shorter than the sniff
    /// length of the mode, a decode error if the header (or, for full loads, the
    /// message) cannot be decoded, or an I/O error.
    pub fn from_source(
        mut source: FeedSource,
        registry: Arc<DecoderRegistry>,
        options: ParserOptions,
    ) -> Result<Self> {
        let dialect = match options.dialect {
            Some(dialect) => dialect,
            None => source.detect_dialect(options.mode.sniff_length())?,
        };

        if options.preprocess {
            let report = source.normalize(&options.normalize_options())?;
            if !report.is_clean() {
                debug!(?report, "Repaired feed encoding");
            }
        }

        registry.register::<S::Product>(dialect, dialect.product_tag())?;
        registry.register::<S::Header>(dialect, dialect.header_tag())?;

        let (header, message) = if options.mode == ParseMode::FullLoad {
            let decoder = registry.register::<S::Message>(dialect, dialect.message_tag())?;
            let message = load_message::<S>(&source, &decoder, options.apply_defaults)?;
            (Arc::new(message.header().clone()), Some(message))
        } else {
            let limit = options.effective_header_scan_limit();
            let header = extract_header::<S::Header>(&source, dialect, &registry, limit)?;
            (Arc::new(header), None)
        };

        info!(
            generation = ?S::GENERATION,
            ?dialect,
            mode = ?options.mode,
            products = message.as_ref().map(FeedMessage::len),
            "Opened feed"
        );

        Ok(FeedParser {
            source,
            dialect,
            options,
            registry,
            header,
            message,
        })
    }

    /// The message header.
    #[must_use]
    pub fn header(&self) -> &S::Header {
        &self.header
    }

    /// Detected or configured tag dialect.
    #[must_use]
    pub fn dialect(&self) -> TagDialect {
        self.dialect
    }

    /// Options the feed was opened with.
    #[must_use]
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Where the feed is read from.
    #[must_use]
    pub fn source(&self) -> &FeedSource {
        &self.source
    }

    /// The decoded message, for full loads.
    #[must_use]
    pub fn message(&self) -> Option<&FeedMessage<S::Header, S::Product>> {
        self.message.as_ref()
    }

    /// Take the decoded message, for full loads.
    #[must_use]
    pub fn into_message(self) -> Option<FeedMessage<S::Header, S::Product>> {
        self.message
    }

    /// Start a new pass over the products.
    ///
    /// Each call reads the feed again from the start, except for full loads,
    /// which hand out the products already decoded.
    #[must_use]
    pub fn records(&self) -> FeedEnumerator<S> {
        match &self.message {
            Some(message) => FeedEnumerator::from_products(
                message.products().to_vec(),
                self.dialect,
                Arc::clone(&self.registry),
                Arc::clone(&self.header),
            ),
            None => FeedEnumerator::new(
                self.source.clone(),
                self.options.mode,
                self.dialect,
                Arc::clone(&self.registry),
                Arc::clone(&self.header),
                self.options.record_options(),
            ),
        }
    }
}

impl<'a, S: Schema> IntoIterator for &'a FeedParser<S> {
    type Item = Result<FeedRecord<S::Product>>;
    type IntoIter = FeedEnumerator<S>;

    fn into_iter(self) -> Self::IntoIter {
        self.records()
    }
}

impl<S: Schema> fmt::Debug for FeedParser<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedParser")
            .field("generation", &S::GENERATION)
            .field("source", &self.source)
            .field("dialect", &self.dialect)
            .field("options", &self.options)
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

/// Decode a whole message and give each product back its own unbound text.
fn load_message<S: Schema>(
    source: &FeedSource,
    decoder: &XmlDecoder<S::Message>,
    apply_defaults: bool,
) -> Result<FeedMessage<S::Header, S::Product>> {
    let text = source.read_to_text()?;
    let product_tag = TagDialect::Reference.product_tag();
    let mut fragments: Vec<Vec<String>> = Vec::new();
    let message = decoder.decode_with(&text, |element| {
        if element.branch != product_tag {
            return;
        }
        if fragments.len() <= element.branch_index {
            fragments.resize_with(element.branch_index + 1, Vec::new);
        }
        fragments[element.branch_index].push(element.text);
    })?;

    let (header, mut products) = S::split_message(message);
    for (index, product) in products.iter_mut().enumerate() {
        if let Some(texts) = fragments.get(index) {
            S::reattach_unbound(product, texts);
        }
        if apply_defaults {
            S::apply_header_defaults(product, &header);
        }
    }

    Ok(FeedMessage::new(header, products))
}
