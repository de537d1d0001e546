#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # onix-feed: streaming ONIX ingestion
//!
//! Reads ONIX for Books feeds (ONIX 2.1 and 3.0, reference or short tags) one
//! product at a time, with bounded memory when asked and without letting one
//! broken product stop the rest of the feed.
//!
//! ## Quick Start
//!
//! ```
//! use onix_feed::{DecoderRegistry, OnixParser, ParserOptions};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), onix_feed::OnixError> {
//! let feed = format!(
//!     "<ONIXmessage release=\"3.0\"><header><m186>GBP</m186></header>\
//!      <product><a001>1</a001></product>\
//!      <product><a001>2</a001><oops></product>\
//!      <!--{}--></ONIXmessage>",
//!     " ".repeat(500)
//! );
//!
//! let registry = Arc::new(DecoderRegistry::new());
//! let parser = OnixParser::from_text(feed, registry, ParserOptions::default())?;
//! assert_eq!(parser.header().default_currency_code.as_deref(), Some("GBP"));
//!
//! let records: Vec<_> = parser.records().collect::<Result<_, _>>()?;
//! assert_eq!(records.len(), 2);
//! assert!(records[0].is_valid());
//! assert!(!records[1].is_valid());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`parser`]: opening feeds ([`OnixParser`], [`LegacyParser`])
//! - [`enumerator`]: record-at-a-time iteration strategies
//! - [`dialect`]: tag dialects, schema generations and dialect detection
//! - [`encoding`]: encoding repair applied before parsing
//! - [`registry`]: decoder cache
//! - [`decoder`]: dialect-aware record decoding
//! - [`reader`]: feed sources and forward-only element readers
//! - [`document`]: whole-document loading for the windowed strategy
//! - [`header`]: header extraction
//! - [`schema`]: ONIX 2.1 and 3.0 record types
//! - [`error`]: error types and result type

pub mod boundary_scanner;
pub mod decoder;
pub mod dialect;
pub mod document;
pub mod encoding;
pub mod enumerator;
pub mod error;
pub mod header;
pub mod message;
pub mod parser;
pub mod reader;
pub mod record;
pub mod registry;
pub mod schema;

pub use decoder::{UnboundElement, XmlDecoder};
pub use dialect::{ParseMode, SchemaGeneration, TagDialect};
pub use encoding::{NormalizeOptions, NormalizeReport};
pub use enumerator::{EnumeratorState, FeedEnumerator, RecordOptions};
pub use error::{DecodeError, OnixError, Result};
pub use header::extract_header;
pub use message::FeedMessage;
pub use parser::{FeedParser, LegacyParser, OnixParser, ParserOptions};
pub use reader::FeedSource;
pub use record::FeedRecord;
pub use registry::{DecoderKey, DecoderRegistry};
pub use schema::{CurrentSchema, LegacySchema, OnixRecord, Schema};
