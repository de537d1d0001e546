//! Feed sources and forward-only element readers.
//!
//! A [`FeedSource`] names where a feed lives: a file on disk or an in-memory
//! text buffer. It is the single input to dialect detection, normalization,
//! full-document loading and [`FeedReader`] construction.
//!
//! [`FeedReader`] is a forward-only cursor over a source that finds elements by
//! local name and returns their exact outer markup without building a tree. The
//! tokenizer never resolves DTDs or external entities. Only the markup of the
//! element being extracted is held in memory.
//!
//! # Examples
//!
//! ```
//! use onix_feed::reader::{ElementScan, FeedSource};
//!
//! let source = FeedSource::from_text("<ONIXMessage><Product><a>1</a></Product></ONIXMessage>")?;
//! let mut reader = source.open()?;
//!
//! match reader.next_element("Product", None)? {
//!     ElementScan::Found(markup) => assert_eq!(markup, "<Product><a>1</a></Product>"),
//!     other => panic!("unexpected scan result: {other:?}"),
//! }
//! assert_eq!(reader.next_element("Product", None)?, ElementScan::NotFound);
//! # Ok::<(), onix_feed::OnixError>(())
//! ```

use crate::dialect::{detect_file_dialect, detect_text_dialect, TagDialect};
use crate::encoding::{normalize_file, normalize_text, NormalizeOptions, NormalizeReport};
use crate::error::{OnixError, Result};
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read buffer size for file-backed readers.
const FILE_BUFFER_SIZE: usize = 64 * 1024;

/// Cheaply cloneable feed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedText(Arc<str>);

impl SharedText {
    /// The text as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SharedText {
    fn from(text: String) -> Self {
        SharedText(Arc::from(text))
    }
}

impl AsRef<[u8]> for SharedText {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Deref for SharedText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

/// Where a feed is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// A file on disk
    File(PathBuf),
    /// An in-memory text buffer
    Text(SharedText),
}

impl FeedSource {
    /// A file-backed source.
    ///
    /// # Errors
    ///
    /// Returns [`OnixError::SourceNotFound`] if nothing exists at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OnixError::SourceNotFound(path.to_path_buf()));
        }
        Ok(FeedSource::File(path.to_path_buf()))
    }

    /// A text-backed source.
    ///
    /// # Errors
    ///
    /// Returns [`OnixError::EmptySource`] if `text` is empty.
    pub fn from_text(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(OnixError::EmptySource);
        }
        Ok(FeedSource::Text(SharedText::from(text)))
    }

    /// Path of a file-backed source.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            FeedSource::File(path) => Some(path),
            FeedSource::Text(_) => None,
        }
    }

    /// Detect the tag dialect from the first `required` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`OnixError::SourceTooSmall`] if the source is shorter than
    /// `required` bytes, or an I/O error.
    pub fn detect_dialect(&self, required: usize) -> Result<TagDialect> {
        match self {
            FeedSource::File(path) => detect_file_dialect(path, required),
            FeedSource::Text(text) => detect_text_dialect(text, required),
        }
    }

    /// Repair the source's encoding in place.
    ///
    /// Files are rewritten on disk; text buffers are replaced.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a file cannot be read or written.
    pub fn normalize(&mut self, options: &NormalizeOptions) -> Result<NormalizeReport> {
        match self {
            FeedSource::File(path) => normalize_file(path, options),
            FeedSource::Text(text) => {
                let mut owned = text.as_str().to_string();
                let report = normalize_text(&mut owned, options);
                if !report.is_clean() {
                    *text = SharedText::from(owned);
                }
                Ok(report)
            },
        }
    }

    /// Read the whole source as text.
    ///
    /// # Errors
    ///
    /// Returns [`OnixError::EncodingError`] if a file is not valid UTF-8, or an
    /// I/O error.
    pub fn read_to_text(&self) -> Result<SharedText> {
        match self {
            FeedSource::File(path) => {
                let bytes = std::fs::read(path)?;
                let text = String::from_utf8(bytes).map_err(|e| {
                    OnixError::EncodingError(format!(
                        "{} is not valid UTF-8 at byte {}",
                        path.display(),
                        e.utf8_error().valid_up_to()
                    ))
                })?;
                Ok(SharedText::from(text))
            },
            FeedSource::Text(text) => Ok(text.clone()),
        }
    }

    /// Open a forward-only reader positioned at the start of the source.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a file cannot be opened.
    pub fn open(&self) -> Result<FeedReader> {
        let inner: Box<dyn BufRead + Send> = match self {
            FeedSource::File(path) => {
                Box::new(BufReader::with_capacity(FILE_BUFFER_SIZE, File::open(path)?))
            },
            FeedSource::Text(text) => Box::new(Cursor::new(text.clone())),
        };
        Ok(FeedReader::new(inner))
    }
}

/// Result of scanning forward for an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementScan {
    /// Exact outer markup of the element
    Found(String),
    /// The element could not be read completely or is not valid UTF-8
    Malformed {
        /// Markup read for the element, lossily decoded
        markup: String,
        /// Tokenizer message
        reason: String,
    },
    /// End of input, or the node limit was reached
    NotFound,
}

/// Buffered reader that records every byte its consumer consumes.
struct CaptureReader<R> {
    inner: R,
    captured: Vec<u8>,
}

impl<R: BufRead> Read for CaptureReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.captured.extend_from_slice(&buf[..read]);
        Ok(read)
    }
}

impl<R: BufRead> BufRead for CaptureReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        if amt > 0 {
            // The buffer is non-empty, so this does not touch the underlying source
            if let Ok(available) = self.inner.fill_buf() {
                let taken = amt.min(available.len());
                self.captured.extend_from_slice(&available[..taken]);
            }
        }
        self.inner.consume(amt);
    }
}

/// Forward-only element reader.
///
/// Dropping the reader closes the underlying file.
pub struct FeedReader {
    reader: quick_xml::Reader<CaptureReader<Box<dyn BufRead + Send>>>,
    buf: Vec<u8>,
    poisoned: bool,
}

impl FeedReader {
    /// Wrap any buffered byte source.
    #[must_use]
    pub fn new(inner: Box<dyn BufRead + Send>) -> Self {
        let mut reader = quick_xml::Reader::from_reader(CaptureReader {
            inner,
            captured: Vec::new(),
        });
        reader.trim_text(false);
        reader.check_end_names(false);

        FeedReader {
            reader,
            buf: Vec::with_capacity(1024),
            poisoned: false,
        }
    }

    /// Bytes consumed from the source so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.reader.buffer_position()
    }

    /// Advance to the next element whose local name is `tag` and return its
    /// exact outer markup.
    ///
    /// With `node_limit`, gives up after reading that many nodes without a match.
    /// After a product could not be read to its end, every later call returns
    /// [`ElementScan::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`OnixError::XmlError`] if the tokenizer fails between elements.
    pub fn next_element(&mut self, tag: &str, node_limit: Option<usize>) -> Result<ElementScan> {
        if self.poisoned {
            return Ok(ElementScan::NotFound);
        }

        let mut nodes = 0usize;
        loop {
            if node_limit.is_some_and(|limit| nodes >= limit) {
                return Ok(ElementScan::NotFound);
            }
            self.discard_captured();
            self.buf.clear();

            let position = self.reader.buffer_position();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => {
                    self.poisoned = true;
                    return Err(OnixError::XmlError(format!("at byte {position}: {e}")));
                },
            };
            nodes += 1;

            match event {
                Event::Start(start) if start.local_name().as_ref() == tag.as_bytes() => {
                    let end_name = start.name().as_ref().to_vec();
                    return Ok(self.capture_element(&end_name));
                },
                Event::Empty(start) if start.local_name().as_ref() == tag.as_bytes() => {
                    self.trim_to_last_tag();
                    let markup = std::mem::take(&mut self.reader.get_mut().captured);
                    return Ok(into_scan(markup, None));
                },
                Event::Eof => return Ok(ElementScan::NotFound),
                _ => {},
            }
        }
    }

    /// Read from just after a start tag through its matching end tag.
    fn capture_element(&mut self, end_name: &[u8]) -> ElementScan {
        self.trim_to_last_tag();
        self.buf.clear();
        let result = self.reader.read_to_end_into(QName(end_name), &mut self.buf);
        let markup = std::mem::take(&mut self.reader.get_mut().captured);

        match result {
            Ok(_) => into_scan(markup, None),
            Err(e) => {
                self.poisoned = true;
                into_scan(markup, Some(e.to_string()))
            },
        }
    }

    /// Keep only the most recent tag in the capture buffer.
    fn trim_to_last_tag(&mut self) {
        let captured = &mut self.reader.get_mut().captured;
        let start = memchr::memrchr(b'<', captured).unwrap_or(0);
        captured.drain(..start);
    }

    /// Drop captured bytes that cannot belong to a later element. A trailing
    /// `<` consumed along with preceding text is kept.
    fn discard_captured(&mut self) {
        let captured = &mut self.reader.get_mut().captured;
        match memchr::memrchr(b'<', captured) {
            Some(start) if memchr::memchr(b'>', &captured[start..]).is_none() => {
                captured.drain(..start);
            },
            _ => captured.clear(),
        }
    }
}

impl fmt::Debug for FeedReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedReader")
            .field("position", &self.reader.buffer_position())
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}

fn into_scan(markup: Vec<u8>, failure: Option<String>) -> ElementScan {
    match (String::from_utf8(markup), failure) {
        (Ok(markup), None) => ElementScan::Found(markup),
        (Ok(markup), Some(reason)) => ElementScan::Malformed { markup, reason },
        (Err(e), failure) => {
            let reason = failure.unwrap_or_else(|| {
                format!("invalid UTF-8 at byte {}", e.utf8_error().valid_up_to())
            });
            ElementScan::Malformed {
                markup: String::from_utf8_lossy(e.as_bytes()).into_owned(),
                reason,
            }
        },
    }
}
