//! # Byte-Order Codec
//!
//! Host-independent conversion of primitive values to and from their
//! canonical little-endian wire form.
//!
//! ## Wire Rules
//!
//! - Integers are split into bytes least-significant first.
//! - Signed integers are two's complement, so `-1i32` is `FF FF FF FF`.
//! - Floats are IEEE-754 bit patterns, little-endian.
//!
//! ## Packed Integers
//!
//! Unsigned values may also be written in a variable-length form: seven
//! value bits per byte, high bit set when another byte follows. Negative
//! numbers cast to `u32` always have their top bits set and therefore always
//! take the full five bytes. Signed values should use the fixed-width form.

use crate::error::{CodecError, CodecResult};

/// Largest value accepted by the packed 16-bit form (15 usable bits).
pub const PACKED_U16_MAX: u16 = 0x7FFF;

/// Maximum encoded size of a packed 32-bit value.
pub const PACKED_U32_MAX_LEN: usize = 5;

/// A fixed-width value with a canonical little-endian wire form.
pub trait Primitive: Copy {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Byte array holding one encoded value.
    type Bytes: AsRef<[u8]>;

    /// Encodes the value. Never fails.
    fn to_wire(self) -> Self::Bytes;

    /// Decodes a value from the front of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Underrun`] if `bytes` is shorter than [`Self::WIDTH`].
    fn from_wire(bytes: &[u8]) -> CodecResult<Self>;
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                #[inline]
                fn to_wire(self) -> Self::Bytes {
                    self.to_le_bytes()
                }

                #[inline]
                fn from_wire(bytes: &[u8]) -> CodecResult<Self> {
                    let raw = bytes.get(..Self::WIDTH).ok_or(CodecError::Underrun {
                        requested: Self::WIDTH,
                        available: bytes.len(),
                    })?;
                    let mut array = [0u8; std::mem::size_of::<$ty>()];
                    array.copy_from_slice(raw);
                    Ok(<$ty>::from_le_bytes(array))
                }
            }
        )*
    };
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Encodes a primitive value into its little-endian bytes.
#[inline]
#[must_use]
pub fn encode<T: Primitive>(value: T) -> T::Bytes {
    value.to_wire()
}

/// Decodes a primitive value from the front of `bytes`.
///
/// # Errors
///
/// Returns [`CodecError::Underrun`] if fewer than `T::WIDTH` bytes are given.
#[inline]
pub fn decode<T: Primitive>(bytes: &[u8]) -> CodecResult<T> {
    T::from_wire(bytes)
}

/// Returns the number of bytes the packed form of `value` occupies.
#[must_use]
pub const fn packed_len_u32(value: u32) -> usize {
    let mut len = 1;
    let mut rest = value >> 7;
    while rest != 0 {
        len += 1;
        rest >>= 7;
    }
    len
}

/// Encodes `value` in packed form into `out`, returning the used length.
#[must_use]
pub fn encode_packed_u32(value: u32, out: &mut [u8; PACKED_U32_MAX_LEN]) -> usize {
    let mut rest = value;
    let mut len = 0;
    loop {
        // Truncation is the point: low seven bits per byte.
        #[allow(clippy::cast_possible_truncation)]
        let mut byte = (rest & 0x7F) as u8;
        rest >>= 7;
        if rest != 0 {
            byte |= 0x80;
        }
        out[len] = byte;
        len += 1;
        if rest == 0 {
            return len;
        }
    }
}

/// Decodes a packed value from the front of `bytes`.
///
/// Returns the value and the number of bytes it occupied.
///
/// # Errors
///
/// Returns [`CodecError::Underrun`] if the continuation chain runs past the
/// end of `bytes`, or [`CodecError::OutOfRange`] if it is longer than five
/// bytes.
pub fn decode_packed_u32(bytes: &[u8]) -> CodecResult<(u32, usize)> {
    let mut value: u64 = 0;
    for (index, &byte) in bytes.iter().enumerate() {
        if index == PACKED_U32_MAX_LEN {
            break;
        }
        value |= u64::from(byte & 0x7F) << (7 * index);
        if byte & 0x80 == 0 {
            let value = u32::try_from(value).map_err(|_| CodecError::OutOfRange {
                value,
                max: u64::from(u32::MAX),
            })?;
            return Ok((value, index + 1));
        }
    }
    if bytes.len() >= PACKED_U32_MAX_LEN {
        return Err(CodecError::OutOfRange { value, max: u64::from(u32::MAX) });
    }
    Err(CodecError::Underrun {
        requested: bytes.len() + 1,
        available: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_int32_is_twos_complement() {
        assert_eq!(encode(-1i32), [0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(encode(-2i16), [0xFE, 0xFF]);
    }

    #[test]
    fn test_float_layout() {
        assert_eq!(encode(3.5f32), [0x00, 0x00, 0x60, 0x40]);
        assert_eq!(decode::<f32>(&[0x00, 0x00, 0x60, 0x40]).unwrap(), 3.5);
    }

    #[test]
    fn test_least_significant_first() {
        assert_eq!(encode(0x1234_5678u32), [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(decode::<u16>(&[0x34, 0x12, 0xFF]).unwrap(), 0x1234);
    }

    #[test]
    fn test_decode_short_input_underruns() {
        assert_eq!(
            decode::<i32>(&[1, 2, 3]),
            Err(CodecError::Underrun { requested: 4, available: 3 })
        );
    }

    #[test]
    fn test_packed_lengths() {
        assert_eq!(packed_len_u32(0), 1);
        assert_eq!(packed_len_u32(0x7F), 1);
        assert_eq!(packed_len_u32(0x80), 2);
        assert_eq!(packed_len_u32(0x3FFF), 2);
        assert_eq!(packed_len_u32(0x4000), 3);
        assert_eq!(packed_len_u32(u32::MAX), 5);
    }

    #[test]
    fn test_packed_negative_takes_five_bytes() {
        #[allow(clippy::cast_sign_loss)]
        let value = -1i32 as u32;
        let mut out = [0u8; PACKED_U32_MAX_LEN];
        assert_eq!(encode_packed_u32(value, &mut out), 5);
        assert_eq!(out, [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn test_packed_decode() {
        let mut out = [0u8; PACKED_U32_MAX_LEN];
        let len = encode_packed_u32(300, &mut out);
        assert_eq!(&out[..len], &[0xAC, 0x02]);
        assert_eq!(decode_packed_u32(&out[..len]).unwrap(), (300, 2));
    }

    #[test]
    fn test_packed_decode_truncated() {
        assert_eq!(
            decode_packed_u32(&[0x80]),
            Err(CodecError::Underrun { requested: 2, available: 1 })
        );
    }

    #[test]
    fn test_packed_decode_too_long() {
        let result = decode_packed_u32(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert!(matches!(result, Err(CodecError::OutOfRange { .. })));
    }
}
