//! # Byte Queue
//!
//! A single-consumer byte source with two explicit read modes:
//!
//! - **Immutable** ([`peek`](ByteQueue::peek), [`reader`](ByteQueue::reader)):
//!   inspect pending bytes any number of times without consuming them.
//!   Used for protocol sniffing, e.g. checking whether a full frame arrived.
//! - **Modifiable** ([`take`](ByteQueue::take), [`consume`](ByteQueue::consume)):
//!   remove bytes from the front of the queue. Used once a frame is complete.
//!
//! The mode is always chosen by calling a different method, never inferred.

use std::collections::VecDeque;

use crate::error::{CodecError, CodecResult};
use crate::reader::Reader;

/// Growable FIFO of received bytes.
#[derive(Debug, Default, Clone)]
pub struct ByteQueue {
    /// Pending bytes, oldest first.
    bytes: VecDeque<u8>,
}

impl ByteQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty queue with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: VecDeque::with_capacity(capacity),
        }
    }

    /// Returns the number of pending bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if no bytes are pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Appends received bytes to the back of the queue.
    pub fn push(&mut self, data: &[u8]) {
        self.bytes.extend(data);
    }

    /// Returns the first `len` bytes without consuming them.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if fewer than `len` bytes are pending.
    pub fn peek(&mut self, len: usize) -> CodecResult<&[u8]> {
        self.check(len)?;
        Ok(&self.bytes.make_contiguous()[..len])
    }

    /// Returns a reader over every pending byte. Nothing is consumed.
    pub fn reader(&mut self) -> Reader<'_> {
        Reader::new(self.bytes.make_contiguous())
    }

    /// Removes and returns the first `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if fewer than `len` bytes are pending;
    /// the queue is left untouched.
    pub fn take(&mut self, len: usize) -> CodecResult<Vec<u8>> {
        self.check(len)?;
        Ok(self.bytes.drain(..len).collect())
    }

    /// Discards the first `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if fewer than `len` bytes are pending;
    /// the queue is left untouched.
    pub fn consume(&mut self, len: usize) -> CodecResult<()> {
        self.check(len)?;
        self.bytes.drain(..len);
        Ok(())
    }

    /// Drops every pending byte.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    fn check(&self, len: usize) -> CodecResult<()> {
        if len > self.bytes.len() {
            return Err(CodecError::Underrun {
                requested: len,
                available: self.bytes.len(),
            });
        }
        Ok(())
    }
}
