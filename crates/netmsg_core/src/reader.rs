//! # Reader
//!
//! Sequential typed reader mirroring [`Writer`](crate::Writer).
//!
//! Reads never partially advance: a typed value is either produced in full
//! or the call fails with [`CodecError::Underrun`] and the position stays
//! where it was. A saved mark allows speculative decoding (read a tag,
//! rewind, decode again with full context).

use std::borrow::Cow;

use crate::byteorder::{self, Primitive, PACKED_U16_MAX};
use crate::error::{CodecError, CodecResult};
use crate::fixed::Fixed;

/// Typed little-endian reader.
///
/// Either borrows its source (shared mode, no copy) or owns a private copy.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    /// Source bytes.
    data: Cow<'a, [u8]>,
    /// Current read position.
    pos: usize,
    /// Saved position for [`rewind`](Self::rewind).
    mark: usize,
}

impl Reader<'static> {
    /// Creates a reader that owns its bytes.
    #[must_use]
    pub fn owned(data: Vec<u8>) -> Self {
        Self {
            data: Cow::Owned(data),
            pos: 0,
            mark: 0,
        }
    }
}

impl<'a> Reader<'a> {
    /// Creates a reader sharing `data` without copying it.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(data),
            pos: 0,
            mark: 0,
        }
    }

    /// Returns the current read position.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the total length of the source.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the source is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of unread bytes.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true once every byte has been consumed.
    #[inline]
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Returns the unread bytes without consuming them.
    #[inline]
    #[must_use]
    pub fn remaining_data(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// Saves the current position.
    #[inline]
    pub fn mark(&mut self) {
        self.mark = self.pos;
    }

    /// Restores the position saved by [`mark`](Self::mark), or zero.
    #[inline]
    pub fn rewind(&mut self) {
        self.pos = self.mark;
    }

    /// Moves to an absolute position.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if `pos` lies beyond the end.
    pub fn seek(&mut self, pos: usize) -> CodecResult<()> {
        if pos > self.data.len() {
            return Err(CodecError::Underrun {
                requested: pos,
                available: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Returns the next `len` bytes without advancing.
    fn window(&self, len: usize) -> CodecResult<&[u8]> {
        self.data
            .get(self.pos..self.pos.saturating_add(len))
            .filter(|window| window.len() == len)
            .ok_or(CodecError::Underrun {
                requested: len,
                available: self.remaining(),
            })
    }

    /// Decodes a primitive without advancing.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if not enough bytes remain.
    pub fn peek<T: Primitive>(&self) -> CodecResult<T> {
        T::from_wire(self.window(T::WIDTH)?)
    }

    /// Reads any primitive value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if not enough bytes remain.
    #[inline]
    pub fn read<T: Primitive>(&mut self) -> CodecResult<T> {
        let value = self.peek::<T>()?;
        self.pos += T::WIDTH;
        Ok(value)
    }

    /// Reads a byte.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] at the end of the source.
    #[inline]
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        self.read()
    }

    /// Reads a signed byte.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] at the end of the source.
    #[inline]
    pub fn read_i8(&mut self) -> CodecResult<i8> {
        self.read()
    }

    /// Reads a `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if fewer than 2 bytes remain.
    #[inline]
    pub fn read_u16(&mut self) -> CodecResult<u16> {
        self.read()
    }

    /// Reads an `i16`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if fewer than 2 bytes remain.
    #[inline]
    pub fn read_i16(&mut self) -> CodecResult<i16> {
        self.read()
    }

    /// Reads a `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if fewer than 4 bytes remain.
    #[inline]
    pub fn read_u32(&mut self) -> CodecResult<u32> {
        self.read()
    }

    /// Reads an `i32`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if fewer than 4 bytes remain.
    #[inline]
    pub fn read_i32(&mut self) -> CodecResult<i32> {
        self.read()
    }

    /// Reads a `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if fewer than 8 bytes remain.
    #[inline]
    pub fn read_u64(&mut self) -> CodecResult<u64> {
        self.read()
    }

    /// Reads an `f32`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if fewer than 4 bytes remain.
    #[inline]
    pub fn read_f32(&mut self) -> CodecResult<f32> {
        self.read()
    }

    /// Reads an `f64`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if fewer than 8 bytes remain.
    #[inline]
    pub fn read_f64(&mut self) -> CodecResult<f64> {
        self.read()
    }

    /// Reads a 16.16 fixed-point value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if fewer than 4 bytes remain.
    #[inline]
    pub fn read_fixed(&mut self) -> CodecResult<Fixed> {
        self.read()
    }

    /// Reads `count` raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if fewer than `count` bytes remain.
    pub fn read_block(&mut self, count: usize) -> CodecResult<&[u8]> {
        let start = self.pos;
        self.window(count)?;
        self.pos += count;
        Ok(&self.data[start..start + count])
    }

    /// Reads a `u32` length followed by that many bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if the prefix or the block is
    /// truncated. The position is unchanged on failure.
    pub fn read_sized_block(&mut self) -> CodecResult<&[u8]> {
        let len = self.peek::<u32>()? as usize;
        let start = self.pos + 4;
        let available = self.remaining() - 4;
        if len > available {
            return Err(CodecError::Underrun { requested: len, available });
        }
        self.pos = start + len;
        Ok(&self.data[start..start + len])
    }

    /// Reads a `u16` length followed by that many UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if truncated, or
    /// [`CodecError::InvalidUtf8`] if the bytes are not UTF-8. The position
    /// is unchanged on failure.
    pub fn read_string(&mut self) -> CodecResult<&str> {
        let len = usize::from(self.peek::<u16>()?);
        let start = self.pos + 2;
        let available = self.remaining() - 2;
        if len > available {
            return Err(CodecError::Underrun { requested: len, available });
        }
        let text = std::str::from_utf8(&self.data[start..start + len])
            .map_err(|_| CodecError::InvalidUtf8)?;
        self.pos = start + len;
        Ok(text)
    }

    /// Reads a packed 16-bit value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if truncated, or
    /// [`CodecError::OutOfRange`] if the value exceeds 0x7FFF.
    pub fn read_packed_u16(&mut self) -> CodecResult<u16> {
        let (value, len) = byteorder::decode_packed_u32(self.remaining_data())?;
        let value = u16::try_from(value)
            .ok()
            .filter(|v| *v <= PACKED_U16_MAX)
            .ok_or(CodecError::OutOfRange {
                value: u64::from(value),
                max: u64::from(PACKED_U16_MAX),
            })?;
        self.pos += len;
        Ok(value)
    }

    /// Reads a packed 32-bit value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if truncated.
    pub fn read_packed_u32(&mut self) -> CodecResult<u32> {
        let (value, len) = byteorder::decode_packed_u32(self.remaining_data())?;
        self.pos += len;
        Ok(value)
    }

    /// Advances past `count` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if fewer than `count` bytes remain.
    pub fn skip(&mut self, count: usize) -> CodecResult<()> {
        self.read_block(count).map(|_| ())
    }
}
