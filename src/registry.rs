//! Decoder cache keyed by record type and root tag.
//!
//! Building an [`XmlDecoder`] allocates its name tables, and a feed may hold tens
//! of thousands of records of one type. The [`DecoderRegistry`] builds each
//! decoder once and hands out shared handles afterwards.
//!
//! Registration must precede lookup: [`DecoderRegistry::get`] never builds a
//! decoder and fails with [`OnixError::MissingDecoder`] for an unknown key.
//!
//! The registry is passed explicitly (usually as an `Arc`) to every parser that
//! uses it. All operations take `&self` and are safe to call from several
//! threads at once.
//!
//! # Examples
//!
//! ```
//! use onix_feed::dialect::TagDialect;
//! use onix_feed::registry::DecoderRegistry;
//! use onix_feed::schema::current::Product;
//! use std::sync::Arc;
//!
//! let registry = DecoderRegistry::new();
//! let first = registry.register::<Product>(TagDialect::Short, "product")?;
//! let second = registry.register::<Product>(TagDialect::Short, "product")?;
//! assert!(Arc::ptr_eq(&first, &second));
//! # Ok::<(), onix_feed::OnixError>(())
//! ```

use crate::decoder::XmlDecoder;
use crate::dialect::TagDialect;
use crate::error::{OnixError, Result};
use crate::schema::OnixRecord;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Identity of a cached decoder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecoderKey {
    /// [`OnixRecord::TYPE_NAME`] of the decoded type
    pub type_name: &'static str,
    /// Root tag the decoder accepts
    pub tag: String,
}

impl DecoderKey {
    /// Key for record type `T` rooted at `tag`.
    #[must_use]
    pub fn of<T: OnixRecord>(tag: &str) -> Self {
        DecoderKey {
            type_name: T::TYPE_NAME,
            tag: tag.to_string(),
        }
    }
}

type Handle = Arc<dyn Any + Send + Sync>;

/// Shared cache of decoders.
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: RwLock<HashMap<DecoderKey, Handle>>,
}

impl DecoderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the decoder for `(T, tag)`, building and storing it on first use.
    ///
    /// Every call with the same key returns the same instance. `dialect` only
    /// matters for the call that builds the decoder.
    ///
    /// # Errors
    ///
    /// Returns [`OnixError::DecoderConflict`] if the key is bound to a decoder
    /// of another Rust type sharing the same type name.
    pub fn register<T: OnixRecord>(
        &self,
        dialect: TagDialect,
        tag: &str,
    ) -> Result<Arc<XmlDecoder<T>>> {
        let key = DecoderKey::of::<T>(tag);

        let existing = self
            .decoders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        let handle = match existing {
            Some(handle) => handle,
            None => {
                let mut decoders = self.decoders.write().unwrap_or_else(PoisonError::into_inner);
                decoders
                    .entry(key.clone())
                    .or_insert_with(|| {
                        debug!(
                            type_name = key.type_name,
                            tag = %key.tag,
                            ?dialect,
                            "Building decoder"
                        );
                        Arc::new(XmlDecoder::<T>::new(dialect, tag)) as Handle
                    })
                    .clone()
            },
        };

        downcast(handle, &key)
    }

    /// Look up the decoder for `(T, tag)` without building it.
    ///
    /// # Errors
    ///
    /// Returns [`OnixError::MissingDecoder`] if the key was never registered,
    /// or [`OnixError::DecoderConflict`] as for [`register`](Self::register).
    pub fn get<T: OnixRecord>(&self, tag: &str) -> Result<Arc<XmlDecoder<T>>> {
        let key = DecoderKey::of::<T>(tag);
        let handle = self
            .decoders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .ok_or_else(|| OnixError::MissingDecoder {
                type_name: key.type_name.to_string(),
                tag: key.tag.clone(),
            })?;

        downcast(handle, &key)
    }

    /// Whether a decoder is registered for `(T, tag)`.
    #[must_use]
    pub fn contains<T: OnixRecord>(&self, tag: &str) -> bool {
        self.decoders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&DecoderKey::of::<T>(tag))
    }

    /// Number of registered decoders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decoders.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no decoder has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decoders = self.decoders.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<_> = decoders.keys().collect();
        keys.sort_by(|a, b| (a.type_name, &a.tag).cmp(&(b.type_name, &b.tag)));
        f.debug_struct("DecoderRegistry").field("keys", &keys).finish()
    }
}

fn downcast<T: OnixRecord>(handle: Handle, key: &DecoderKey) -> Result<Arc<XmlDecoder<T>>> {
    handle
        .downcast::<XmlDecoder<T>>()
        .map_err(|_| OnixError::DecoderConflict {
            type_name: key.type_name.to_string(),
            tag: key.tag.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::current::{Header, Product};
    use crate::schema::legacy::LegacyProduct;
    use std::thread;

    #[test]
    fn test_register_returns_same_instance() {
        let registry = DecoderRegistry::new();
        let first = registry.register::<Product>(TagDialect::Reference, "Product").unwrap();
        let second = registry.register::<Product>(TagDialect::Reference, "Product").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_keys_get_distinct_decoders() {
        let registry = DecoderRegistry::new();
        let reference = registry.register::<Product>(TagDialect::Reference, "Product").unwrap();
        let short = registry.register::<Product>(TagDialect::Short, "product").unwrap();
        registry.register::<LegacyProduct>(TagDialect::Short, "product").unwrap();

        assert!(!Arc::ptr_eq(&reference, &short));
        assert_eq!(short.dialect(), TagDialect::Short);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_get_after_register() {
        let registry = DecoderRegistry::new();
        let registered = registry.register::<Header>(TagDialect::Short, "header").unwrap();
        let fetched = registry.get::<Header>("header").unwrap();

        assert!(Arc::ptr_eq(&registered, &fetched));
        assert!(registry.contains::<Header>("header"));
    }

    #[test]
    fn test_get_missing_decoder() {
        let registry = DecoderRegistry::new();
        assert!(registry.is_empty());

        match registry.get::<Product>("Product") {
            Err(OnixError::MissingDecoder { type_name, tag }) => {
                assert_eq!(type_name, "onix3::Product");
                assert_eq!(tag, "Product");
            },
            other => panic!("expected MissingDecoder, got {other:?}"),
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_registration_builds_once() {
        let registry = Arc::new(DecoderRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    registry.register::<Product>(TagDialect::Short, "product").unwrap()
                })
            })
            .collect();
        let decoders: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(decoders.iter().all(|d| Arc::ptr_eq(d, &decoders[0])));
        assert_eq!(registry.len(), 1);
    }
}
