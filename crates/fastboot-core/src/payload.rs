//! Data phase chunking.
//!
//! The payload handed to `download` is opaque; it is only split into
//! fixed-size pieces, one bulk write each.

use crate::protocol::constants::DATA_CHUNK_SIZE;

/// Number of chunks needed to send `len` bytes. `chunk_size` must be non-zero.
fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size)
}

/// Iterator over the data phase chunks of a payload.
#[derive(Debug)]
pub struct DataChunks<'a> {
    data: &'a [u8],
    chunk_size: usize,
    offset: usize,
    total_chunks: usize,
    current_chunk: usize,
}

impl<'a> DataChunks<'a> {
    /// # Panics
    ///
    /// Panics if `chunk_size` is 0.
    pub fn new(data: &'a [u8], chunk_size: usize) -> Self {
        assert!(chunk_size != 0, "chunk size must be non-zero");
        Self {
            data,
            chunk_size,
            offset: 0,
            total_chunks: chunk_count(data.len(), chunk_size),
            current_chunk: 0,
        }
    }

    /// Chunks of the protocol's fixed data phase size.
    pub fn protocol(data: &'a [u8]) -> Self {
        Self::new(data, DATA_CHUNK_SIZE)
    }

    /// Total number of chunks.
    pub fn total(&self) -> usize {
        self.total_chunks
    }

    /// Number of chunks yielded so far.
    pub fn current(&self) -> usize {
        self.current_chunk
    }

    /// Bytes yielded so far.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for DataChunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        let end = (self.offset + self.chunk_size).min(self.data.len());
        let chunk = &self.data[self.offset..end];
        self.offset = end;
        self.current_chunk += 1;

        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total_chunks - self.current_chunk;
        (left, Some(left))
    }
}

impl ExactSizeIterator for DataChunks<'_> {}
