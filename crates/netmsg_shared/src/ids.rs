//! # Identifiers
//!
//! Small value types naming who sent a message and on which channel.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a connected peer (the sender of an inbound message or the
/// destination of an outbound one).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// The local/server side.
    pub const SERVER: Self = Self(0);

    /// Every connected peer.
    pub const BROADCAST: Self = Self(u32::MAX);

    /// Returns true if this addresses every peer.
    #[inline]
    #[must_use]
    pub const fn is_broadcast(self) -> bool {
        self.0 == u32::MAX
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::SERVER
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_broadcast() {
            write!(f, "player(*)")
        } else {
            write!(f, "player({})", self.0)
        }
    }
}

/// Delivery channel of a message (one bit on the wire).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Channel {
    /// Ordered, must arrive.
    #[default]
    Reliable = 0,
    /// May be dropped or superseded.
    Unreliable = 1,
}

impl Channel {
    /// Returns the channel encoded by `bit` (only the lowest bit counts).
    #[inline]
    #[must_use]
    pub const fn from_bit(bit: u8) -> Self {
        if bit & 1 == 0 {
            Self::Reliable
        } else {
            Self::Unreliable
        }
    }

    /// Returns the wire bit for this channel.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }
}
