//! Record enumeration.
//!
//! A [`FeedEnumerator`] walks the products of a feed one at a time and decodes
//! each through the shared decoder. Where the product markup comes from is a
//! [`ProductCursor`]:
//!
//! - [`WindowedDomCursor`]: loads the whole document once and serves products
//!   by index from a node list.
//! - [`StreamingCursor`]: advances a forward-only reader and never holds more
//!   than one product's markup.
//!
//! Both cursors are opened lazily on the first [`advance`](FeedEnumerator::advance),
//! and released as soon as the enumerator is exhausted.
//!
//! Decoding is identical for every strategy. A product that fails to decode is
//! yielded as a [`FeedRecord::Failed`] carrying its markup, so one bad record
//! never ends iteration. Only conditions that make the whole feed unreadable
//! (a missing decoder, an unloadable document, I/O failures) are returned as
//! errors; they leave the enumerator exhausted.
//!
//! Enumeration is single-pass: there is no way to rewind.

mod streaming;
mod windowed;

pub use streaming::StreamingCursor;
pub use windowed::WindowedDomCursor;

use crate::decoder::XmlDecoder;
use crate::dialect::{ParseMode, TagDialect};
use crate::error::{DecodeError, Result};
use crate::reader::FeedSource;
use crate::record::FeedRecord;
use crate::registry::DecoderRegistry;
use crate::schema::Schema;
use smallvec::SmallVec;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::debug;

/// Markup of one product element as read from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductMarkup {
    /// Complete outer markup
    Complete(String),
    /// The element could not be read to its end
    Malformed {
        /// Markup read before the failure
        markup: String,
        /// Tokenizer message
        reason: String,
    },
}

/// Source of product markup, in document order.
pub trait ProductCursor: Send {
    /// Next product element, or `None` at the end of the feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the source can no longer be read.
    fn next_product(&mut self) -> Result<Option<ProductMarkup>>;
}

/// Where an enumerator is in its single pass over the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumeratorState {
    /// `advance` has not been called
    NotStarted,
    /// Positioned on the record with this zero-based index
    Positioned(usize),
    /// No more records; absorbing
    Exhausted,
}

/// Decoding behaviour shared by every strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOptions {
    /// Backfill unset product fields from the header
    pub apply_defaults: bool,
    /// Keep the source markup on successfully decoded records
    pub retain_input_xml: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        RecordOptions {
            apply_defaults: true,
            retain_input_xml: true,
        }
    }
}

/// Where an enumerator takes its products from.
enum Origin<P> {
    /// Read from a source with the given strategy
    Source {
        source: FeedSource,
        mode: ParseMode,
        cursor: Option<Box<dyn ProductCursor>>,
    },
    /// Already decoded by a full load
    Loaded(std::vec::IntoIter<P>),
}

/// Forward-only enumerator over the products of one feed.
pub struct FeedEnumerator<S: Schema> {
    origin: Origin<S::Product>,
    dialect: TagDialect,
    registry: Arc<DecoderRegistry>,
    decoder: Option<Arc<XmlDecoder<S::Product>>>,
    header: Arc<S::Header>,
    options: RecordOptions,
    state: EnumeratorState,
    current: Option<FeedRecord<S::Product>>,
    fragments: SmallVec<[String; 4]>,
}

impl<S: Schema> FeedEnumerator<S> {
    /// Enumerate the products of `source`.
    ///
    /// The product decoder for `dialect` must be registered in `registry` before
    /// the first call to [`advance`](Self::advance). [`ParseMode::FullLoad`] is
    /// read like [`ParseMode::WindowedDom`].
    #[must_use]
    pub fn new(
        source: FeedSource,
        mode: ParseMode,
        dialect: TagDialect,
        registry: Arc<DecoderRegistry>,
        header: Arc<S::Header>,
        options: RecordOptions,
    ) -> Self {
        FeedEnumerator {
            origin: Origin::Source {
                source,
                mode,
                cursor: None,
            },
            dialect,
            registry,
            decoder: None,
            header,
            options,
            state: EnumeratorState::NotStarted,
            current: None,
            fragments: SmallVec::new(),
        }
    }

    /// Enumerate products that were already decoded.
    ///
    /// Records carry no source markup.
    #[must_use]
    pub fn from_products(
        products: Vec<S::Product>,
        dialect: TagDialect,
        registry: Arc<DecoderRegistry>,
        header: Arc<S::Header>,
    ) -> Self {
        FeedEnumerator {
            origin: Origin::Loaded(products.into_iter()),
            dialect,
            registry,
            decoder: None,
            header,
            options: RecordOptions::default(),
            state: EnumeratorState::NotStarted,
            current: None,
            fragments: SmallVec::new(),
        }
    }

    /// Current position.
    #[must_use]
    pub fn state(&self) -> EnumeratorState {
        self.state
    }

    /// Header used for defaults.
    #[must_use]
    pub fn header(&self) -> &S::Header {
        &self.header
    }

    /// Move to the next record.
    ///
    /// Returns `Ok(false)` once the feed is exhausted, and on every call after.
    ///
    /// # Errors
    ///
    /// Returns [`OnixError::MissingDecoder`](crate::OnixError::MissingDecoder)
    /// if the product decoder was never registered, or an error if the source
    /// cannot be loaded or read. The enumerator is exhausted afterwards.
    pub fn advance(&mut self) -> Result<bool> {
        let index = match self.state {
            EnumeratorState::Exhausted => return Ok(false),
            EnumeratorState::NotStarted => 0,
            EnumeratorState::Positioned(index) => index + 1,
        };

        match self.next_record(index) {
            Ok(Some(record)) => {
                self.current = Some(record);
                self.state = EnumeratorState::Positioned(index);
                Ok(true)
            },
            Ok(None) => {
                debug!(records = index, "Feed exhausted");
                self.finish();
                Ok(false)
            },
            Err(e) => {
                self.finish();
                Err(e)
            },
        }
    }

    /// The record at the current position.
    ///
    /// `None` before the first advance and after exhaustion.
    #[must_use]
    pub fn current(&self) -> Option<&FeedRecord<S::Product>> {
        self.current.as_ref()
    }

    /// Unbound text fragments of the current record, in document order.
    ///
    /// Empty for failed records and for products handed out by a full load,
    /// whose text is already reattached.
    #[must_use]
    pub fn current_unbound(&self) -> &[String] {
        &self.fragments
    }

    /// Does nothing: enumeration cannot be rewound.
    ///
    /// Create a new enumerator to read the feed again.
    pub fn reset(&mut self) {}

    fn finish(&mut self) {
        self.state = EnumeratorState::Exhausted;
        self.current = None;
        self.fragments.clear();
        match &mut self.origin {
            Origin::Source { cursor, .. } => *cursor = None,
            Origin::Loaded(products) => *products = Vec::new().into_iter(),
        }
    }

    fn next_record(&mut self, index: usize) -> Result<Option<FeedRecord<S::Product>>> {
        self.fragments.clear();
        let markup = match &mut self.origin {
            Origin::Loaded(products) => {
                return Ok(products.next().map(|product| FeedRecord::Decoded {
                    product,
                    raw_xml: None,
                }));
            },
            Origin::Source { source, mode, cursor } => {
                if cursor.is_none() {
                    let tag = self.dialect.product_tag();
                    self.decoder = Some(self.registry.get::<S::Product>(tag)?);
                    *cursor = Some(open_cursor(source, *mode, tag)?);
                }
                match cursor.as_mut() {
                    Some(cursor) => cursor.next_product()?,
                    None => None,
                }
            },
        };

        let (Some(markup), Some(decoder)) = (markup, self.decoder.clone()) else {
            return Ok(None);
        };
        Ok(Some(self.decode(&decoder, index, markup)))
    }

    fn decode(
        &mut self,
        decoder: &XmlDecoder<S::Product>,
        index: usize,
        markup: ProductMarkup,
    ) -> FeedRecord<S::Product> {
        let xml = match markup {
            ProductMarkup::Complete(xml) => xml,
            ProductMarkup::Malformed { markup, reason } => {
                debug!(index, %reason, "Product could not be read");
                return FeedRecord::Failed {
                    product: S::Product::default(),
                    error: DecodeError::Malformed {
                        position: markup.len(),
                        message: reason,
                    },
                    raw_xml: markup,
                };
            },
        };

        let fragments = &mut self.fragments;
        let decoded = decoder.decode_with(&xml, |element| fragments.push(element.text));

        match decoded {
            Ok(mut product) => {
                if !self.fragments.is_empty() {
                    S::reattach_unbound(&mut product, &self.fragments);
                }
                if self.options.apply_defaults {
                    S::apply_header_defaults(&mut product, &self.header);
                }
                FeedRecord::Decoded {
                    product,
                    raw_xml: self.options.retain_input_xml.then_some(xml),
                }
            },
            Err(error) => {
                debug!(index, %error, "Product failed to decode");
                self.fragments.clear();
                FeedRecord::Failed {
                    product: S::Product::default(),
                    raw_xml: xml,
                    error,
                }
            },
        }
    }
}

fn open_cursor(
    source: &FeedSource,
    mode: ParseMode,
    tag: &'static str,
) -> Result<Box<dyn ProductCursor>> {
    Ok(match mode {
        ParseMode::FullLoad | ParseMode::WindowedDom => {
            Box::new(WindowedDomCursor::open(source, tag)?)
        },
        ParseMode::ForwardStreaming => Box::new(StreamingCursor::open(source, tag)?),
    })
}

impl<S: Schema> Iterator for FeedEnumerator<S> {
    type Item = Result<FeedRecord<S::Product>>;

    /// Advance and take the record; [`current`](FeedEnumerator::current) is
    /// empty afterwards.
    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(true) => self.current.take().map(Ok),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<S: Schema> FusedIterator for FeedEnumerator<S> {}

impl<S: Schema> fmt::Debug for FeedEnumerator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match &self.origin {
            Origin::Source { mode, .. } => Some(*mode),
            Origin::Loaded(_) => None,
        };
        f.debug_struct("FeedEnumerator")
            .field("generation", &S::GENERATION)
            .field("dialect", &self.dialect)
            .field("mode", &mode)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OnixError;
    use crate::schema::current::{Header, Product};
    use crate::schema::CurrentSchema;

    const FEED: &str = "<ONIXMessage><Header><DefaultCurrencyCode>EUR</DefaultCurrencyCode></Header>\
        <Product><RecordReference>1</RecordReference></Product>\
        <Product><RecordReference>2</RecordReference><Bad></Product>\
        <Product><RecordReference>3</RecordReference><ProductSupply><SupplyDetail>\
        <Price><PriceAmount>4.5</PriceAmount></Price></SupplyDetail></ProductSupply></Product>\
        </ONIXMessage>";

    fn enumerator(mode: ParseMode, options: RecordOptions) -> FeedEnumerator<CurrentSchema> {
        let registry = Arc::new(DecoderRegistry::new());
        registry.register::<Product>(TagDialect::Reference, "Product").unwrap();
        let header = Header {
            default_currency_code: Some("EUR".to_string()),
            ..Header::default()
        };
        FeedEnumerator::new(
            FeedSource::from_text(FEED).unwrap(),
            mode,
            TagDialect::Reference,
            registry,
            Arc::new(header),
            options,
        )
    }

    #[test]
    fn test_state_machine() {
        for mode in [ParseMode::WindowedDom, ParseMode::ForwardStreaming] {
            let mut records = enumerator(mode, RecordOptions::default());
            assert_eq!(records.state(), EnumeratorState::NotStarted);
            assert!(records.current().is_none());

            let mut seen = Vec::new();
            while records.advance().unwrap() {
                let EnumeratorState::Positioned(index) = records.state() else {
                    panic!("expected a position");
                };
                seen.push((index, records.current().unwrap().is_valid()));
            }

            assert_eq!(seen, vec![(0, true), (1, false), (2, true)], "{mode:?}");
            assert_eq!(records.state(), EnumeratorState::Exhausted);
            assert!(!records.advance().unwrap());
            assert!(!records.advance().unwrap());
            assert!(records.current().is_none());
        }
    }

    #[test]
    fn test_failed_record_carries_markup() {
        let failed = enumerator(ParseMode::WindowedDom, RecordOptions::default())
            .nth(1)
            .unwrap()
            .unwrap();
        assert_eq!(
            failed.raw_xml(),
            Some("<Product><RecordReference>2</RecordReference><Bad></Product>")
        );
        assert!(matches!(failed.error(), Some(DecodeError::Malformed { .. })));
        assert_eq!(failed.product(), &Product::default());
    }

    #[test]
    fn test_defaults_and_markup_options() {
        let applied: Vec<_> = enumerator(ParseMode::ForwardStreaming, RecordOptions::default())
            .map(|r| r.unwrap())
            .collect();
        let price = applied[2].product().prices().next().unwrap();
        assert_eq!(price.currency_code.as_deref(), Some("EUR"));
        assert!(applied[0].raw_xml().is_some());

        let options = RecordOptions {
            apply_defaults: false,
            retain_input_xml: false,
        };
        let plain: Vec<_> = enumerator(ParseMode::ForwardStreaming, options)
            .map(|r| r.unwrap())
            .collect();
        assert!(plain[2].product().prices().next().unwrap().currency_code.is_none());
        assert!(plain[0].raw_xml().is_none());
        assert!(plain[1].raw_xml().is_some());
    }

    #[test]
    fn test_missing_decoder_is_fatal() {
        let mut records: FeedEnumerator<CurrentSchema> = FeedEnumerator::new(
            FeedSource::from_text(FEED).unwrap(),
            ParseMode::WindowedDom,
            TagDialect::Reference,
            Arc::new(DecoderRegistry::new()),
            Arc::new(Header::default()),
            RecordOptions::default(),
        );

        assert!(matches!(records.advance(), Err(OnixError::MissingDecoder { .. })));
        assert_eq!(records.state(), EnumeratorState::Exhausted);
        assert!(!records.advance().unwrap());
    }

    #[test]
    fn test_reset_does_not_rewind() {
        let mut records = enumerator(ParseMode::WindowedDom, RecordOptions::default());
        assert!(records.advance().unwrap());
        records.reset();
        assert!(records.advance().unwrap());
        assert_eq!(records.state(), EnumeratorState::Positioned(1));
    }

    #[test]
    fn test_current_unbound_follows_the_record() {
        use crate::schema::legacy::{LegacyHeader, LegacyProduct};
        use crate::schema::LegacySchema;

        let feed = "<ONIXMessage>\
            <Product><RecordReference>1</RecordReference>\
            <OtherText><TextTypeCode>01</TextTypeCode><Text>a</Text></OtherText>\
            <OtherText><TextTypeCode>02</TextTypeCode><Text>b</Text></OtherText></Product>\
            <Product><RecordReference>2</RecordReference></Product>\
            <Product><RecordReference>3</RecordReference>\
            <OtherText><Text>lost</Text></OtherText><Bad></Product>\
            </ONIXMessage>";
        let registry = Arc::new(DecoderRegistry::new());
        registry.register::<LegacyProduct>(TagDialect::Reference, "Product").unwrap();

        for mode in [ParseMode::WindowedDom, ParseMode::ForwardStreaming] {
            let mut records: FeedEnumerator<LegacySchema> = FeedEnumerator::new(
                FeedSource::from_text(feed).unwrap(),
                mode,
                TagDialect::Reference,
                Arc::clone(&registry),
                Arc::new(LegacyHeader::default()),
                RecordOptions::default(),
            );
            assert!(records.current_unbound().is_empty());

            assert!(records.advance().unwrap());
            assert_eq!(records.current_unbound(), ["a", "b"], "{mode:?}");
            assert!(records.advance().unwrap());
            assert!(records.current_unbound().is_empty(), "{mode:?}");
            assert!(records.advance().unwrap());
            assert!(!records.current().unwrap().is_valid());
            assert!(records.current_unbound().is_empty(), "{mode:?}");
            assert!(!records.advance().unwrap());
            assert!(records.current_unbound().is_empty());
        }
    }

    #[test]
    fn test_loaded_products() {
        let products = vec![
            Product {
                record_reference: "a".to_string(),
                ..Product::default()
            },
            Product {
                record_reference: "b".to_string(),
                ..Product::default()
            },
        ];
        let records: FeedEnumerator<CurrentSchema> = FeedEnumerator::from_products(
            products,
            TagDialect::Reference,
            Arc::new(DecoderRegistry::new()),
            Arc::new(Header::default()),
        );
        let references: Vec<_> = records
            .map(|r| r.unwrap().into_product().record_reference)
            .collect();
        assert_eq!(references, vec!["a", "b"]);
    }
}
