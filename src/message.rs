//! Fully loaded messages.

/// Header and products of a feed decoded in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedMessage<H, P> {
    header: H,
    products: Vec<P>,
}

impl<H, P> FeedMessage<H, P> {
    /// Assemble a message from its parts.
    #[must_use]
    pub fn new(header: H, products: Vec<P>) -> Self {
        FeedMessage { header, products }
    }

    /// The message header.
    #[must_use]
    pub fn header(&self) -> &H {
        &self.header
    }

    /// Products in document order.
    #[must_use]
    pub fn products(&self) -> &[P] {
        &self.products
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the message has no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Split into header and products.
    #[must_use]
    pub fn into_parts(self) -> (H, Vec<P>) {
        (self.header, self.products)
    }
}

impl<'a, H, P> IntoIterator for &'a FeedMessage<H, P> {
    type Item = &'a P;
    type IntoIter = std::slice::Iter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.products.iter()
    }
}
