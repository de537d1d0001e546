//! Dialect-aware XML record decoder.
//!
//! An [`XmlDecoder`] turns the outer markup of one element into a typed record.
//! Serde field names are always reference names, so decoding runs in two passes:
//!
//! 1. A strict tokenizer pass rewrites the fragment into the reference dialect,
//!    drops namespace prefixes, comments and processing instructions, checks the
//!    root element and pulls out any child elements the record type cannot bind.
//! 2. `quick_xml::de` deserializes the rewritten fragment.
//!
//! Child elements listed by [`OnixRecord::unbound_elements`] are removed from the
//! fragment during the first pass and handed to a caller-supplied hook as
//! [`UnboundElement`] values, in document order.
//!
//! # Examples
//!
//! ```
//! use onix_feed::decoder::XmlDecoder;
//! use onix_feed::dialect::TagDialect;
//! use onix_feed::schema::current::Product;
//!
//! let decoder = XmlDecoder::<Product>::new(TagDialect::Short, "product");
//! let product = decoder.decode("<product><a001>ref-1</a001></product>")?;
//! assert_eq!(product.record_reference, "ref-1");
//! # Ok::<(), onix_feed::DecodeError>(())
//! ```

use crate::dialect::TagDialect;
use crate::error::{DecodeError, OnixError, Result};
use crate::schema::OnixRecord;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Text content of a child element that ordinary decoding cannot bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnboundElement {
    /// Reference name of the enclosing element
    pub parent: &'static str,
    /// Reference name of the element itself
    pub name: &'static str,
    /// Concatenated, unescaped text of the element and its descendants
    pub text: String,
    /// Reference name of the root's child element that encloses this element
    pub branch: String,
    /// Index of that child among the root's children with the same name
    pub branch_index: usize,
}

/// An unbound element being collected.
struct Capture {
    parent: &'static str,
    name: &'static str,
    depth: usize,
    text: String,
}

/// Decoder for one record type in one tag dialect.
pub struct XmlDecoder<T> {
    dialect: TagDialect,
    root: String,
    reference_root: String,
    to_reference: HashMap<&'static str, &'static str>,
    to_wire: HashMap<&'static str, &'static str>,
    unbound: &'static [(&'static str, &'static str)],
    _record: PhantomData<fn() -> T>,
}

impl<T: OnixRecord> XmlDecoder<T> {
    /// Build a decoder for elements named `root` in `dialect`.
    ///
    /// Building the name tables costs a few allocations; share decoders through
    /// a [`DecoderRegistry`](crate::registry::DecoderRegistry).
    #[must_use]
    pub fn new(dialect: TagDialect, root: &str) -> Self {
        let (to_reference, to_wire) = match dialect {
            TagDialect::Reference => (HashMap::new(), HashMap::new()),
            TagDialect::Short => {
                let tags = T::short_tags();
                (
                    tags.iter().map(|&(reference, short)| (short, reference)).collect(),
                    tags.iter().copied().collect(),
                )
            },
        };
        let reference_root = to_reference
            .get(root)
            .map_or_else(|| root.to_string(), |name: &&str| (*name).to_string());

        XmlDecoder {
            dialect,
            root: root.to_string(),
            reference_root,
            to_reference,
            to_wire,
            unbound: T::unbound_elements(),
            _record: PhantomData,
        }
    }

    /// Dialect this decoder reads and writes.
    #[must_use]
    pub fn dialect(&self) -> TagDialect {
        self.dialect
    }

    /// Root element name this decoder accepts.
    #[must_use]
    pub fn root_tag(&self) -> &str {
        &self.root
    }

    /// Decode one element's outer markup, discarding unbound content.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the markup is malformed, has an unexpected
    /// root element or does not fit `T`.
    pub fn decode(&self, xml: &str) -> std::result::Result<T, DecodeError> {
        self.decode_with(xml, |_| {})
    }

    /// Decode one element's outer markup, passing unbound content to `on_unbound`.
    ///
    /// The hook runs during the tokenizer pass, so it may see elements from a
    /// fragment that later fails to deserialize.
    ///
    /// # Errors
    ///
    /// Same as [`decode`](Self::decode).
    pub fn decode_with<F>(
        &self,
        xml: &str,
        mut on_unbound: F,
    ) -> std::result::Result<T, DecodeError>
    where
        F: FnMut(UnboundElement),
    {
        let canonical = self.canonicalize(xml, &mut on_unbound)?;
        quick_xml::de::from_str(&canonical).map_err(|e| DecodeError::Mismatch(e.to_string()))
    }

    /// Serialize a record to markup in this decoder's dialect.
    ///
    /// Unbound elements are not written.
    ///
    /// # Errors
    ///
    /// Returns [`OnixError::XmlError`] if serialization fails.
    pub fn encode(&self, value: &T) -> Result<String> {
        let xml = quick_xml::se::to_string_with_root(&self.reference_root, value)
            .map_err(|e| {
                OnixError::XmlError(format!("Failed to serialize {}: {e}", T::TYPE_NAME))
            })?;

        if self.dialect.is_reference() {
            return Ok(xml);
        }
        self.to_short(&xml)
    }

    fn reference_name(&self, local: &str) -> String {
        self.to_reference
            .get(local)
            .map_or_else(|| local.to_string(), |name| (*name).to_string())
    }

    /// The unbound `(parent, child)` pair matching `reference` opened under the
    /// innermost element of `open`, if any.
    fn unbound_at(
        &self,
        open: &[String],
        reference: &str,
    ) -> Option<(&'static str, &'static str)> {
        let parent = open.last()?;
        self.unbound
            .iter()
            .copied()
            .find(|&(p, c)| p == parent.as_str() && c == reference)
    }

    fn canonicalize(
        &self,
        xml: &str,
        on_unbound: &mut dyn FnMut(UnboundElement),
    ) -> std::result::Result<String, DecodeError> {
        let mut reader = Reader::from_str(xml);
        reader.check_end_names(true);

        let mut writer = Writer::new(Vec::with_capacity(xml.len()));
        let mut open: SmallVec<[String; 16]> = SmallVec::new();
        let mut capture: Option<Capture> = None;
        let mut root_seen = false;
        let mut branches: HashMap<String, usize> = HashMap::new();
        let mut branch = (String::new(), 0);

        loop {
            let position = reader.buffer_position();
            let malformed = |message: String| DecodeError::Malformed { position, message };

            let event = reader.read_event().map_err(|e| malformed(e.to_string()))?;
            match event {
                Event::Start(start) => {
                    if let Some(active) = capture.as_mut() {
                        active.depth += 1;
                        continue;
                    }
                    let local = local_name(start.local_name().into_inner(), position)?;
                    let reference = self.reference_name(local);
                    if open.is_empty() {
                        self.check_root(local, root_seen)?;
                        root_seen = true;
                    } else {
                        if open.len() == 1 {
                            branch = next_branch(&mut branches, &reference);
                        }
                        if let Some((parent, name)) = self.unbound_at(&open, &reference) {
                            capture = Some(Capture {
                                parent,
                                name,
                                depth: 1,
                                text: String::new(),
                            });
                            continue;
                        }
                    }

                    let renamed = rename_start(&start, &reference, position)?;
                    writer
                        .write_event(Event::Start(renamed))
                        .map_err(|e| malformed(e.to_string()))?;
                    open.push(reference);
                },
                Event::Empty(start) => {
                    if capture.is_some() {
                        continue;
                    }
                    let local = local_name(start.local_name().into_inner(), position)?;
                    let reference = self.reference_name(local);
                    if open.is_empty() {
                        self.check_root(local, root_seen)?;
                        root_seen = true;
                    } else {
                        if open.len() == 1 {
                            branch = next_branch(&mut branches, &reference);
                        }
                        if let Some((parent, name)) = self.unbound_at(&open, &reference) {
                            on_unbound(UnboundElement {
                                parent,
                                name,
                                text: String::new(),
                                branch: branch.0.clone(),
                                branch_index: branch.1,
                            });
                            continue;
                        }
                    }

                    let renamed = rename_start(&start, &reference, position)?;
                    writer
                        .write_event(Event::Empty(renamed))
                        .map_err(|e| malformed(e.to_string()))?;
                },
                Event::End(_) => {
                    if let Some(mut active) = capture.take() {
                        active.depth -= 1;
                        if active.depth == 0 {
                            on_unbound(UnboundElement {
                                parent: active.parent,
                                name: active.name,
                                text: active.text,
                                branch: branch.0.clone(),
                                branch_index: branch.1,
                            });
                        } else {
                            capture = Some(active);
                        }
                        continue;
                    }
                    let Some(reference) = open.pop() else {
                        return Err(malformed("unmatched closing tag".to_string()));
                    };
                    writer
                        .write_event(Event::End(BytesEnd::new(reference)))
                        .map_err(|e| malformed(e.to_string()))?;
                },
                Event::Text(text) => {
                    if let Some(active) = capture.as_mut() {
                        let unescaped = text.unescape().map_err(|e| malformed(e.to_string()))?;
                        active.text.push_str(&unescaped);
                    } else if !open.is_empty() {
                        writer
                            .write_event(Event::Text(text))
                            .map_err(|e| malformed(e.to_string()))?;
                    }
                },
                Event::CData(data) => {
                    if let Some(active) = capture.as_mut() {
                        let raw = std::str::from_utf8(&data).map_err(|e| malformed(e.to_string()))?;
                        active.text.push_str(raw);
                    } else if !open.is_empty() {
                        writer
                            .write_event(Event::CData(data))
                            .map_err(|e| malformed(e.to_string()))?;
                    }
                },
                Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => {},
                Event::Eof => break,
            }
        }

        if let Some(name) = open.last() {
            return Err(DecodeError::Malformed {
                position: xml.len(),
                message: format!("unexpected end of input inside <{name}>"),
            });
        }
        if capture.is_some() {
            return Err(DecodeError::Malformed {
                position: xml.len(),
                message: "unexpected end of input inside unbound element".to_string(),
            });
        }
        if !root_seen {
            return Err(DecodeError::EmptyFragment);
        }

        String::from_utf8(writer.into_inner()).map_err(|e| DecodeError::Malformed {
            position: e.utf8_error().valid_up_to(),
            message: e.to_string(),
        })
    }

    fn check_root(&self, local: &str, root_seen: bool) -> std::result::Result<(), DecodeError> {
        if root_seen {
            return Err(DecodeError::Malformed {
                position: 0,
                message: format!("more than one root element (<{local}>)"),
            });
        }
        if local != self.root {
            return Err(DecodeError::UnexpectedElement {
                expected: self.root.clone(),
                found: local.to_string(),
            });
        }
        Ok(())
    }

    /// Rename reference element names to short names.
    fn to_short(&self, xml: &str) -> Result<String> {
        let mut reader = Reader::from_str(xml);
        let mut writer = Writer::new(Vec::with_capacity(xml.len()));
        let write_error = |e: quick_xml::Error| {
            OnixError::XmlError(format!("Failed to write {}: {e}", T::TYPE_NAME))
        };

        loop {
            let position = reader.buffer_position();
            match reader.read_event().map_err(|e| OnixError::XmlError(e.to_string()))? {
                Event::Start(start) => {
                    let renamed = self.wire_start(&start, position)?;
                    writer.write_event(Event::Start(renamed)).map_err(write_error)?;
                },
                Event::Empty(start) => {
                    let renamed = self.wire_start(&start, position)?;
                    writer.write_event(Event::Empty(renamed)).map_err(write_error)?;
                },
                Event::End(end) => {
                    let name = std::str::from_utf8(end.name().into_inner())
                        .map_err(|e| OnixError::EncodingError(e.to_string()))?;
                    let wire = self.to_wire.get(name).copied().unwrap_or(name);
                    writer
                        .write_event(Event::End(BytesEnd::new(wire)))
                        .map_err(write_error)?;
                },
                Event::Eof => break,
                other => writer.write_event(other).map_err(write_error)?,
            }
        }

        String::from_utf8(writer.into_inner()).map_err(|e| OnixError::EncodingError(e.to_string()))
    }

    fn wire_start(&self, start: &BytesStart<'_>, position: usize) -> Result<BytesStart<'static>> {
        let name = local_name(start.name().into_inner(), position)?;
        let wire = self.to_wire.get(name).copied().unwrap_or(name);
        rename_start(start, wire, position).map_err(OnixError::from)
    }
}

impl<T> fmt::Debug for XmlDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlDecoder")
            .field("type", &std::any::type_name::<T>())
            .field("dialect", &self.dialect)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Count one more child of the root named `name` and return its position.
fn next_branch(seen: &mut HashMap<String, usize>, name: &str) -> (String, usize) {
    let count = seen.entry(name.to_string()).or_insert(0);
    let index = *count;
    *count += 1;
    (name.to_string(), index)
}

fn local_name(bytes: &[u8], position: usize) -> std::result::Result<&str, DecodeError> {
    std::str::from_utf8(bytes).map_err(|e| DecodeError::Malformed {
        position,
        message: format!("invalid element name: {e}"),
    })
}

/// Copy a start tag under a new name, keeping attribute values escaped as
/// written and dropping namespace declarations and attribute prefixes.
fn rename_start(
    start: &BytesStart<'_>,
    name: &str,
    position: usize,
) -> std::result::Result<BytesStart<'static>, DecodeError> {
    let mut renamed = BytesStart::new(name.to_string());
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| DecodeError::Malformed {
            position,
            message: e.to_string(),
        })?;
        let key = attribute.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        renamed.push_attribute(Attribute {
            key: QName(attribute.key.local_name().into_inner()),
            value: attribute.value,
        });
    }
    Ok(renamed.into_owned())
}
