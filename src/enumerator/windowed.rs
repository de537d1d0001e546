use super::{ProductCursor, ProductMarkup};
use crate::document::{FeedDocument, NodeList};
use crate::error::Result;
use crate::reader::FeedSource;
use tracing::debug;

/// Serves products by index from a fully loaded document.
///
/// The document and its node list are built once, when the cursor opens, and
/// held until it is dropped.
#[derive(Debug)]
pub struct WindowedDomCursor {
    nodes: NodeList,
    next: usize,
}

impl WindowedDomCursor {
    /// Load `source` and select every element named `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or tokenized.
    pub fn open(source: &FeedSource, tag: &str) -> Result<Self> {
        let document = FeedDocument::load(source)?;
        let nodes = document.elements_by_tag_name(tag)?;
        debug!(
            tag,
            products = nodes.len(),
            bytes = document.text().len(),
            "Loaded feed document"
        );
        Ok(WindowedDomCursor { nodes, next: 0 })
    }

    /// Number of products in the document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document has no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl ProductCursor for WindowedDomCursor {
    fn next_product(&mut self) -> Result<Option<ProductMarkup>> {
        let markup = self
            .nodes
            .outer_xml(self.next)
            .map(|xml| ProductMarkup::Complete(xml.to_string()));
        if markup.is_some() {
            self.next += 1;
        }
        Ok(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serves_products_in_order() {
        let source = FeedSource::from_text("<m><p>1</p><x/><p>2</p></m>").unwrap();
        let mut cursor = WindowedDomCursor::open(&source, "p").unwrap();

        assert_eq!(cursor.len(), 2);
        let complete = |xml: &str| Some(ProductMarkup::Complete(xml.to_string()));
        assert_eq!(cursor.next_product().unwrap(), complete("<p>1</p>"));
        assert_eq!(cursor.next_product().unwrap(), complete("<p>2</p>"));
        assert_eq!(cursor.next_product().unwrap(), None);
        assert_eq!(cursor.next_product().unwrap(), None);
    }
}
