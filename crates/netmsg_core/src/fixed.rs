//! # Fixed-Point Numbers
//!
//! 16.16 signed fixed-point values, the engine's native unit for map
//! coordinates and angles on the wire.
//!
//! Encoded as the raw `i32` in little-endian order, so the wire form is
//! identical on every host.

use std::fmt;
use std::ops::{Add, Neg, Sub};

use crate::byteorder::Primitive;
use crate::error::CodecResult;

/// Number of fractional bits.
pub const FRAC_BITS: u32 = 16;

/// Raw value of `1.0`.
pub const FRAC_UNIT: i32 = 1 << FRAC_BITS;

/// A 16.16 signed fixed-point number.
///
/// # Range
///
/// - Minimum: -32768.0
/// - Maximum: 32767.99998
///
/// # Example
///
/// ```rust,ignore
/// let half = Fixed::from_f32(0.5);
/// assert_eq!(half.raw(), 0x8000);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Fixed(i32);

impl Fixed {
    /// Zero value.
    pub const ZERO: Self = Self(0);

    /// One unit (1.0).
    pub const ONE: Self = Self(FRAC_UNIT);

    /// Creates a value from its raw representation.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw representation.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Creates a value from a whole number.
    #[inline]
    #[must_use]
    pub const fn from_int(whole: i16) -> Self {
        Self((whole as i32) << FRAC_BITS)
    }

    /// Returns the whole part, rounded toward negative infinity.
    #[inline]
    #[must_use]
    pub const fn floor(self) -> i32 {
        self.0 >> FRAC_BITS
    }

    /// Converts from a float, saturating at the representable range.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f32(value: f32) -> Self {
        // `as` saturates for out-of-range floats and maps NaN to zero.
        Self((value * FRAC_UNIT as f32) as i32)
    }

    /// Converts to a float.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / FRAC_UNIT as f32
    }
}

impl Add for Fixed {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Fixed {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl Neg for Fixed {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self::Output {
        Self(self.0.wrapping_neg())
    }
}

impl Primitive for Fixed {
    const WIDTH: usize = 4;
    type Bytes = [u8; 4];

    #[inline]
    fn to_wire(self) -> Self::Bytes {
        self.0.to_wire()
    }

    #[inline]
    fn from_wire(bytes: &[u8]) -> CodecResult<Self> {
        i32::from_wire(bytes).map(Self)
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({})", self.to_f32())
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}
