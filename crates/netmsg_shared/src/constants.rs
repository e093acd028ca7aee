//! # Network Constants
//!
//! **CRITICAL:** These values are part of the wire contract.
//! Changing them breaks compatibility with deployed peers.

// =============================================================================
// MESSAGE BUFFER
// =============================================================================

/// Maximum size of one message in bytes, type tag included.
pub const NETBUFFER_MAXSIZE: usize = 0x7FFFF;

/// Size of the leading type tag of every message.
pub const MESSAGE_TYPE_SIZE: usize = 1;

/// Message type reserved for "no message" / padding.
pub const MSG_NONE: u8 = 0;

// =============================================================================
// ENGINE MESSAGE TYPES
// =============================================================================

/// Connection handshake.
pub const MSG_HANDSHAKE: u8 = 1;

/// Chat line.
pub const MSG_CHAT: u8 = 2;

/// Acknowledgement of a numbered message.
pub const MSG_ACK: u8 = 3;

/// Finale script, carried as an opaque blob.
pub const MSG_FINALE: u8 = 4;

/// An encoded packet for the packet protocol.
pub const MSG_PACKET: u8 = 5;

// =============================================================================
// TRANSPORT
// =============================================================================

/// Default TCP port for game traffic.
pub const DEFAULT_PORT: u16 = 13209;

/// Default bind address (accepts connections from all interfaces).
pub const DEFAULT_BIND: &str = "0.0.0.0:13209";

/// Size of the stream frame header: `u32` length plus one flags byte.
pub const FRAME_HEADER_SIZE: usize = 5;

/// Frame flag bit carrying the message channel.
pub const FRAME_FLAG_CHANNEL: u8 = 0x01;
