//! Line-aligned chunk boundary detection for parallel preprocessing.
//!
//! This module splits a byte buffer into blocks of roughly equal size whose
//! boundaries always fall immediately after a `\n` byte, located with the
//! SIMD-accelerated `memchr` crate. A newline byte never occurs inside a
//! multi-byte UTF-8 sequence or inside an entity reference, so every
//! transformation applied per block produces the same bytes it would produce
//! over the whole buffer.
//!
//! # Example
//!
//! ```
//! use onix_feed::boundary_scanner::ChunkBoundaryScanner;
//!
//! let buffer = b"<a>1</a>\n<b>2</b>\n<c>3</c>";
//! let mut scanner = ChunkBoundaryScanner::new(4);
//! let chunks = scanner.scan(buffer);
//!
//! assert_eq!(chunks, vec![(0, 9), (9, 9), (18, 8)]);
//! ```

/// The byte that chunk boundaries are aligned to.
const LINE_TERMINATOR: u8 = b'\n';

/// Default target block size (4 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Splits buffers into newline-aligned `(offset, length)` blocks.
#[derive(Debug)]
pub struct ChunkBoundaryScanner {
    /// Target size of each block; blocks extend to the next newline
    chunk_size: usize,
    /// Pre-allocated buffer for reuse across scans
    boundaries: Vec<(usize, usize)>,
}

impl Default for ChunkBoundaryScanner {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ChunkBoundaryScanner {
    /// Create a scanner targeting blocks of `chunk_size` bytes.
    ///
    /// A `chunk_size` of zero is treated as one.
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            boundaries: Vec::with_capacity(16),
        }
    }

    /// Scan a buffer for block boundaries.
    ///
    /// Returns `(offset, length)` tuples that cover the buffer exactly, in order.
    /// Every block except the last ends with a newline byte. A buffer without
    /// any newline is returned as a single block; an empty buffer yields none.
    ///
    /// # Examples
    ///
    /// ```
    /// use onix_feed::boundary_scanner::ChunkBoundaryScanner;
    ///
    /// let mut scanner = ChunkBoundaryScanner::new(1);
    /// assert_eq!(scanner.scan(b"ab\ncd\n"), vec![(0, 3), (3, 3)]);
    /// ```
    pub fn scan(&mut self, buffer: &[u8]) -> Vec<(usize, usize)> {
        self.boundaries.clear();
        let mut offset = 0;

        while offset < buffer.len() {
            let target = offset + self.chunk_size;
            if target >= buffer.len() {
                self.boundaries.push((offset, buffer.len() - offset));
                break;
            }

            // Extend the block up to and including the next newline
            let end = match memchr::memchr(LINE_TERMINATOR, &buffer[target - 1..]) {
                Some(pos) => target + pos,
                None => buffer.len(),
            };
            self.boundaries.push((offset, end - offset));
            offset = end;
        }

        self.boundaries.clone()
    }

    /// Get the number of newline-terminated lines in a buffer.
    #[must_use]
    pub fn count_lines(&self, buffer: &[u8]) -> usize {
        memchr::memchr_iter(LINE_TERMINATOR, buffer).count()
    }

    /// The target block size.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}
