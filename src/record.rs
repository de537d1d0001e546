//! Records yielded by enumeration.

use crate::error::DecodeError;

/// One product element, decoded or not.
///
/// Failure is part of the value rather than an error: a record that could not
/// be decoded is still yielded, in document order, carrying its markup and the
/// reason it failed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedRecord<P> {
    /// The product decoded successfully.
    Decoded {
        /// Decoded product
        product: P,
        /// Exact source markup, when retained
        raw_xml: Option<String>,
    },
    /// The product could not be decoded.
    Failed {
        /// Default-valued product of the expected type
        product: P,
        /// Exact source markup
        raw_xml: String,
        /// Why decoding failed
        error: DecodeError,
    },
}

impl<P> FeedRecord<P> {
    /// Whether the product decoded successfully.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, FeedRecord::Decoded { .. })
    }

    /// The product; default-valued for failed records.
    #[must_use]
    pub fn product(&self) -> &P {
        match self {
            FeedRecord::Decoded { product, .. } | FeedRecord::Failed { product, .. } => product,
        }
    }

    /// Take the product.
    #[must_use]
    pub fn into_product(self) -> P {
        match self {
            FeedRecord::Decoded { product, .. } | FeedRecord::Failed { product, .. } => product,
        }
    }

    /// Source markup of the element, if retained.
    #[must_use]
    pub fn raw_xml(&self) -> Option<&str> {
        match self {
            FeedRecord::Decoded { raw_xml, .. } => raw_xml.as_deref(),
            FeedRecord::Failed { raw_xml, .. } => Some(raw_xml),
        }
    }

    /// Decode failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&DecodeError> {
        match self {
            FeedRecord::Decoded { .. } => None,
            FeedRecord::Failed { error, .. } => Some(error),
        }
    }

    /// Convert into a `Result`, dropping the markup.
    ///
    /// # Errors
    ///
    /// Returns the decode failure of a failed record.
    pub fn into_result(self) -> Result<P, DecodeError> {
        match self {
            FeedRecord::Decoded { product, .. } => Ok(product),
            FeedRecord::Failed { error, .. } => Err(error),
        }
    }
}
