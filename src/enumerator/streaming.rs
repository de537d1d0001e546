use super::{ProductCursor, ProductMarkup};
use crate::error::Result;
use crate::reader::{ElementScan, FeedReader, FeedSource};

/// Slices products out of a forward-only reader, one at a time.
///
/// Only the markup of the product being read is buffered. A product that cannot
/// be read to its end is returned as [`ProductMarkup::Malformed`] and ends the
/// stream.
#[derive(Debug)]
pub struct StreamingCursor {
    reader: FeedReader,
    tag: &'static str,
}

impl StreamingCursor {
    /// Open a reader over `source` that yields elements named `tag`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the source cannot be opened.
    pub fn open(source: &FeedSource, tag: &'static str) -> Result<Self> {
        Ok(StreamingCursor {
            reader: source.open()?,
            tag,
        })
    }
}

impl ProductCursor for StreamingCursor {
    fn next_product(&mut self) -> Result<Option<ProductMarkup>> {
        Ok(match self.reader.next_element(self.tag, None)? {
            ElementScan::Found(markup) => Some(ProductMarkup::Complete(markup)),
            ElementScan::Malformed { markup, reason } => {
                Some(ProductMarkup::Malformed { markup, reason })
            },
            ElementScan::NotFound => None,
        })
    }
}
