//! Record schema collaborator.
//!
//! The ingestion engine treats a decoded record as an opaque typed value. This
//! module defines the two traits that connect it to concrete record types:
//!
//! - [`OnixRecord`]: a type a decoder can be built for: its cache name, its
//!   reference-to-short tag table and any child elements that attribute-driven
//!   decoding cannot bind.
//! - [`Schema`]: one schema generation: its header, product and message types,
//!   header-default backfilling and the reattachment of unbound text.
//!
//! Two minimal schemas are provided: [`current`] (ONIX 3.0) and [`legacy`] (ONIX 2.1).

pub mod current;
pub mod legacy;
pub mod tags;

use crate::dialect::SchemaGeneration;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

pub use current::CurrentSchema;
pub use legacy::LegacySchema;

/// A record type that can be decoded from one XML element.
pub trait OnixRecord: DeserializeOwned + Serialize + Default + Debug + Send + Sync + 'static {
    /// Name used in decoder cache keys.
    const TYPE_NAME: &'static str;

    /// Pairs of `(reference, short)` element names this type can contain.
    fn short_tags() -> &'static [(&'static str, &'static str)];

    /// Pairs of `(parent, child)` reference element names that cannot be bound
    /// by ordinary decoding and are delivered through the side channel instead.
    fn unbound_elements() -> &'static [(&'static str, &'static str)] {
        &[]
    }
}

/// One ONIX schema generation.
pub trait Schema: Debug + Send + Sync + 'static {
    /// Which generation this schema implements.
    const GENERATION: SchemaGeneration;

    /// Message header type.
    type Header: OnixRecord + Clone;
    /// Product record type.
    type Product: OnixRecord + Clone;
    /// Whole-message type used for full loads.
    type Message: OnixRecord;

    /// Split a fully decoded message into its header and products.
    fn split_message(message: Self::Message) -> (Self::Header, Vec<Self::Product>);

    /// Backfill unset product fields from header defaults.
    fn apply_header_defaults(product: &mut Self::Product, header: &Self::Header);

    /// Reattach side-channel text fragments to a product by position.
    ///
    /// Returns how many fragments were consumed.
    fn reattach_unbound(_product: &mut Self::Product, _fragments: &[String]) -> usize {
        0
    }
}
