//! Error types for ONIX feed operations.
//!
//! This module provides two error types:
//!
//! - [`OnixError`] for conditions that abort a whole parse (missing source,
//!   source too small to sniff, missing decoder registration, I/O failures).
//! - [`DecodeError`] for conditions that only affect a single record. These are
//!   never propagated out of an enumerator; they are attached to the yielded
//!   [`FeedRecord`](crate::record::FeedRecord) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for all fatal ONIX feed operations.
#[derive(Error, Debug)]
pub enum OnixError {
    /// The feed file does not exist.
    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// In-memory feed content is empty.
    #[error("Source content is empty")]
    EmptySource,

    /// The source is shorter than the prefix needed to detect its dialect.
    #[error("Source too small: {actual} bytes available, at least {required} required")]
    SourceTooSmall {
        /// Minimum number of bytes needed for dialect detection
        required: usize,
        /// Number of bytes actually available
        actual: usize,
    },

    /// A decoder was looked up before it was registered.
    #[error("Missing decoder for type={type_name}, tag={tag}")]
    MissingDecoder {
        /// Record type name of the lookup key
        type_name: String,
        /// Root tag of the lookup key
        tag: String,
    },

    /// A decoder key is bound to a decoder of a different Rust type.
    #[error("Decoder for type={type_name}, tag={tag} is registered with a different record type")]
    DecoderConflict {
        /// Record type name of the key
        type_name: String,
        /// Root tag of the key
        tag: String,
    },

    /// The source bytes could not be interpreted as text.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// The XML tokenizer failed outside of any single record.
    #[error("XML error: {0}")]
    XmlError(String),

    /// A header or full message failed to decode.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// IO error from the underlying source.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Error describing why a single XML fragment could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The fragment is not well-formed XML.
    #[error("Malformed markup at byte {position}: {message}")]
    Malformed {
        /// Byte offset within the fragment where tokenizing failed
        position: usize,
        /// Tokenizer message
        message: String,
    },

    /// The fragment's root element is not the one the decoder is bound to.
    #[error("Unexpected element <{found}>, expected <{expected}>")]
    UnexpectedElement {
        /// Root tag the decoder expects
        expected: String,
        /// Root tag actually found
        found: String,
    },

    /// The fragment contains no element at all.
    #[error("Fragment contains no root element")]
    EmptyFragment,

    /// The markup is well-formed but does not fit the target type.
    #[error("Type mismatch: {0}")]
    Mismatch(String),
}

/// Convenience type alias for [`std::result::Result`] with [`OnixError`].
pub type Result<T> = std::result::Result<T, OnixError>;
