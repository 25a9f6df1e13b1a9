//! Fixed-size chunking of batch inputs.

use std::collections::VecDeque;

/// Splits `items` into consecutive groups of at most `size` elements.
///
/// Every group except possibly the last holds exactly `size` elements and
/// concatenating the groups reproduces the input. A `size` of zero is
/// treated as one.
#[must_use]
pub fn chunk<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter().peekable();

    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }

    chunks
}

/// Work queue of chunks, last chunk first.
///
/// A resubmitted chunk is always the next one taken.
#[derive(Debug, Clone)]
pub struct ChunkQueue<T> {
    chunks: Vec<Vec<T>>,
}

impl<T> ChunkQueue<T> {
    /// Creates a queue by chunking `items`.
    #[must_use]
    pub fn new(items: Vec<T>, size: usize) -> Self {
        Self {
            chunks: chunk(items, size),
        }
    }

    /// Takes the next chunk to submit.
    pub fn next_chunk(&mut self) -> Option<Vec<T>> {
        self.chunks.pop()
    }

    /// Queues a resubmission so that it is taken next.
    pub fn push_retry(&mut self, chunk: Vec<T>) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    /// Number of queued chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total number of queued items.
    #[must_use]
    pub fn pending_items(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

/// Item-level work queue drained from the front in groups.
///
/// Resubmitted items go back to the front in their original order, so the
/// next group is topped up with fresh items up to the group size.
#[derive(Debug, Clone)]
pub struct KeyQueue<T> {
    items: VecDeque<T>,
    size: usize,
}

impl<T> KeyQueue<T> {
    /// Creates a queue handing out groups of at most `size` items. A `size`
    /// of zero is treated as one.
    #[must_use]
    pub fn new(items: Vec<T>, size: usize) -> Self {
        Self {
            items: items.into(),
            size: size.max(1),
        }
    }

    /// Takes up to `size` items from the front.
    pub fn next_chunk(&mut self) -> Option<Vec<T>> {
        if self.items.is_empty() {
            return None;
        }
        let take = self.size.min(self.items.len());
        Some(self.items.drain(..take).collect())
    }

    /// Puts `items` back at the front, ahead of everything still queued.
    pub fn push_retry(&mut self, items: Vec<T>) {
        for item in items.into_iter().rev() {
            self.items.push_front(item);
        }
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
