//! Reusable per-connection byte buffer.
//!
//! Every request on a connection is built in, and every reply is read into,
//! the same [`Buffer`]. It grows to whatever a single exchange needs, but once
//! its capacity exceeds the configured ceiling it is released on the next
//! resize, so one very large reply does not pin that memory for the life of
//! the connection.
//!
//! A buffer belongs to exactly one connection and is not synchronized.
use log::trace;

use super::codec::ApiWriter;

/// Default capacity ceiling, 8 MiB.
pub const DEFAULT_MAX_ALLOC: usize = 8 * 1024 * 1024;

#[derive(Debug)]
pub struct Buffer {
    inner: Vec<u8>,
    max_alloc: usize,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ALLOC)
    }
}

impl Buffer {
    pub fn new(max_alloc: usize) -> Self {
        Self {
            inner: Vec::new(),
            max_alloc,
        }
    }

    pub fn max_alloc(&self) -> usize {
        self.max_alloc
    }

    pub fn set_max_alloc(&mut self, max_alloc: usize) {
        self.max_alloc = max_alloc;
    }

    /// Makes the logical length exactly `size`, zero-filling any growth, and
    /// returns the resized contents.
    pub fn resize(&mut self, size: usize) -> &mut [u8] {
        if self.inner.capacity() > self.max_alloc {
            trace!(
                "releasing buffer of {} bytes (ceiling {})",
                self.inner.capacity(),
                self.max_alloc
            );
            self.inner = Vec::new();
        }
        self.inner.resize(size, 0);
        &mut self.inner
    }

    /// Grows the logical length to `size` without releasing storage and
    /// returns the contents.
    pub(crate) fn extend_to(&mut self, size: usize) -> &mut [u8] {
        self.inner.resize(size, 0);
        &mut self.inner
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.inner.truncate(len);
    }

    /// Empties the buffer and hands out a writer appending to it.
    pub fn writer(&mut self) -> ApiWriter<'_> {
        self.resize(0);
        ApiWriter::new(&mut self.inner)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_sets_exact_length() {
        let mut buffer = Buffer::new(1024);

        assert_eq!(buffer.resize(16).len(), 16);
        assert_eq!(buffer.resize(4).len(), 4);
        assert_eq!(buffer.len(), 4);
        assert!(buffer.capacity() >= 16);
    }

    #[test]
    fn growth_is_zero_filled() {
        let mut buffer = Buffer::new(1024);
        buffer.resize(2).copy_from_slice(&[7, 7]);
        buffer.resize(0);

        assert_eq!(buffer.resize(3), &[0, 0, 0]);
    }

    #[test]
    fn capacity_above_ceiling_is_released() {
        let mut buffer = Buffer::new(64);
        buffer.resize(4096);
        assert!(buffer.capacity() > 64);

        buffer.resize(8);
        assert_eq!(buffer.len(), 8);
        assert!(buffer.capacity() <= 64);
    }

    #[test]
    fn capacity_below_ceiling_is_kept() {
        let mut buffer = Buffer::new(4096);
        buffer.resize(1024);
        let capacity = buffer.capacity();

        buffer.resize(8);
        assert_eq!(buffer.capacity(), capacity);
    }

    #[test]
    fn writer_starts_empty() {
        let mut buffer = Buffer::new(1024);
        buffer.resize(10);
        buffer.writer().put_u16(1);

        assert_eq!(buffer.as_slice(), &[0, 1]);
    }
}
