//! # Writer
//!
//! Append-only typed writer over a byte buffer.
//!
//! ## Ownership Modes
//!
//! - **Growable**: owns a `Vec<u8>` that grows on demand, optionally up to a
//!   hard byte limit (used for network messages bounded by the buffer size).
//! - **Fixed**: borrows a caller-owned slice and never writes past its end
//!   (used to fill a network buffer in place).
//!
//! ## All-or-Nothing
//!
//! Every write checks the remaining capacity *before* touching the buffer.
//! A write either lands completely or fails with [`CodecError::Overflow`]
//! and leaves both contents and position untouched.

use crate::byteorder::{self, Primitive, PACKED_U16_MAX, PACKED_U32_MAX_LEN};
use crate::error::{CodecError, CodecResult};
use crate::fixed::Fixed;

/// Backing storage of a writer.
#[derive(Debug)]
enum Backing<'a> {
    /// Owned storage; `buf.len()` always equals the write position.
    Growable {
        /// The written bytes.
        buf: Vec<u8>,
        /// Hard size limit in bytes.
        limit: usize,
    },
    /// Caller-owned storage.
    Fixed(&'a mut [u8]),
}

/// Typed little-endian writer.
///
/// # Example
///
/// ```
/// use netmsg_core::Writer;
///
/// let mut writer = Writer::new();
/// writer.write_i32(-1).unwrap();
/// writer.write_f32(3.5).unwrap();
/// assert_eq!(writer.data(), &[0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x60, 0x40]);
/// ```
#[derive(Debug)]
pub struct Writer<'a> {
    /// Storage.
    backing: Backing<'a>,
    /// Current write position (== logical length).
    pos: usize,
}

impl Writer<'static> {
    /// Creates an unbounded growable writer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an unbounded growable writer with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity_hint: usize) -> Self {
        Self::with_limit(capacity_hint, usize::MAX)
    }

    /// Creates a growable writer that refuses to grow beyond `limit` bytes.
    #[must_use]
    pub fn with_limit(capacity_hint: usize, limit: usize) -> Self {
        Self::from_vec(Vec::with_capacity(capacity_hint.min(limit)), limit)
    }

    /// Creates a growable writer reusing `buf`'s allocation.
    ///
    /// Any existing contents of `buf` are discarded.
    #[must_use]
    pub fn from_vec(mut buf: Vec<u8>, limit: usize) -> Self {
        buf.clear();
        Self {
            backing: Backing::Growable { buf, limit },
            pos: 0,
        }
    }
}

impl Default for Writer<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Writer<'a> {
    /// Creates a writer over a caller-owned fixed buffer.
    #[must_use]
    pub fn fixed(buf: &'a mut [u8]) -> Self {
        Self {
            backing: Backing::Fixed(buf),
            pos: 0,
        }
    }

    /// Returns true if this writer is bound to a fixed external buffer.
    #[inline]
    #[must_use]
    pub const fn is_fixed(&self) -> bool {
        matches!(self.backing, Backing::Fixed(_))
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.pos
    }

    /// Returns true if nothing has been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// Returns the maximum number of bytes this writer will accept.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        match &self.backing {
            Backing::Growable { limit, .. } => *limit,
            Backing::Fixed(buf) => buf.len(),
        }
    }

    /// Returns the number of bytes that can still be written.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.pos
    }

    /// Returns true if writing `len` more bytes would exceed the capacity.
    #[inline]
    #[must_use]
    pub fn would_overflow(&self, len: usize) -> bool {
        len > self.remaining()
    }

    /// Returns the bytes written so far.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        match &self.backing {
            Backing::Growable { buf, .. } => buf,
            Backing::Fixed(buf) => &buf[..self.pos],
        }
    }

    /// Rewinds to position zero, keeping the storage.
    pub fn reset(&mut self) {
        if let Backing::Growable { buf, .. } = &mut self.backing {
            buf.clear();
        }
        self.pos = 0;
    }

    /// Consumes the writer and returns the written bytes.
    ///
    /// Growable writers hand back their allocation; fixed writers copy.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        match self.backing {
            Backing::Growable { buf, .. } => buf,
            Backing::Fixed(buf) => buf[..self.pos].to_vec(),
        }
    }

    /// Claims `len` bytes at the current position.
    fn claim(&mut self, len: usize) -> CodecResult<&mut [u8]> {
        if self.would_overflow(len) {
            return Err(CodecError::Overflow {
                requested: len,
                available: self.remaining(),
            });
        }
        let start = self.pos;
        self.pos += len;
        match &mut self.backing {
            Backing::Growable { buf, .. } => {
                buf.resize(start + len, 0);
                Ok(&mut buf[start..])
            }
            Backing::Fixed(buf) => Ok(&mut buf[start..start + len]),
        }
    }

    /// Writes any primitive value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if the value does not fit.
    #[inline]
    pub fn write<T: Primitive>(&mut self, value: T) -> CodecResult<()> {
        let bytes = value.to_wire();
        self.write_block(bytes.as_ref())
    }

    /// Writes a single byte.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if the writer is full.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.write(value)
    }

    /// Writes a signed byte.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if the writer is full.
    #[inline]
    pub fn write_i8(&mut self, value: i8) -> CodecResult<()> {
        self.write(value)
    }

    /// Writes a `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if fewer than 2 bytes remain.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> CodecResult<()> {
        self.write(value)
    }

    /// Writes an `i16`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if fewer than 2 bytes remain.
    #[inline]
    pub fn write_i16(&mut self, value: i16) -> CodecResult<()> {
        self.write(value)
    }

    /// Writes a `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if fewer than 4 bytes remain.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> CodecResult<()> {
        self.write(value)
    }

    /// Writes an `i32`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if fewer than 4 bytes remain.
    #[inline]
    pub fn write_i32(&mut self, value: i32) -> CodecResult<()> {
        self.write(value)
    }

    /// Writes a `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if fewer than 8 bytes remain.
    #[inline]
    pub fn write_u64(&mut self, value: u64) -> CodecResult<()> {
        self.write(value)
    }

    /// Writes an `f32`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if fewer than 4 bytes remain.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> CodecResult<()> {
        self.write(value)
    }

    /// Writes an `f64`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if fewer than 8 bytes remain.
    #[inline]
    pub fn write_f64(&mut self, value: f64) -> CodecResult<()> {
        self.write(value)
    }

    /// Writes a 16.16 fixed-point value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if fewer than 4 bytes remain.
    #[inline]
    pub fn write_fixed(&mut self, value: Fixed) -> CodecResult<()> {
        self.write(value)
    }

    /// Writes raw bytes with no length prefix.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if `bytes` does not fit.
    pub fn write_block(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.claim(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Writes a `u32` length followed by the bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if prefix and bytes do not fit
    /// together, or [`CodecError::OutOfRange`] for blocks over 4 GiB.
    pub fn write_sized_block(&mut self, bytes: &[u8]) -> CodecResult<()> {
        let len = u32::try_from(bytes.len()).map_err(|_| CodecError::OutOfRange {
            value: bytes.len() as u64,
            max: u64::from(u32::MAX),
        })?;
        let out = self.claim(4 + bytes.len())?;
        out[..4].copy_from_slice(&byteorder::encode(len));
        out[4..].copy_from_slice(bytes);
        Ok(())
    }

    /// Writes a `u16` length followed by the UTF-8 bytes of `text`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if the string does not fit, or
    /// [`CodecError::OutOfRange`] for strings longer than 65535 bytes.
    pub fn write_string(&mut self, text: &str) -> CodecResult<()> {
        let len = u16::try_from(text.len()).map_err(|_| CodecError::OutOfRange {
            value: text.len() as u64,
            max: u64::from(u16::MAX),
        })?;
        let out = self.claim(2 + text.len())?;
        out[..2].copy_from_slice(&byteorder::encode(len));
        out[2..].copy_from_slice(text.as_bytes());
        Ok(())
    }

    /// Writes a packed 16-bit value: one byte below 0x80, two below
    /// 0x4000, three up to 0x7FFF.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::OutOfRange`] for values above 0x7FFF, or
    /// [`CodecError::Overflow`] if the encoding does not fit.
    pub fn write_packed_u16(&mut self, value: u16) -> CodecResult<()> {
        if value > PACKED_U16_MAX {
            return Err(CodecError::OutOfRange {
                value: u64::from(value),
                max: u64::from(PACKED_U16_MAX),
            });
        }
        self.write_packed_u32(u32::from(value))
    }

    /// Writes a packed 32-bit value (one to five bytes).
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if the encoding does not fit.
    pub fn write_packed_u32(&mut self, value: u32) -> CodecResult<()> {
        let mut out = [0u8; PACKED_U32_MAX_LEN];
        let len = byteorder::encode_packed_u32(value, &mut out);
        self.write_block(&out[..len])
    }
}
