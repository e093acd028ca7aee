//! # NETMSG Shared
//!
//! Types and constants both ends of a connection agree on.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER open sockets or spawn threads. If you need
//! transport code, put it in `netmsg_networking`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod constants;
pub mod ids;

pub use config::{ConfigError, ConfigResult, NetConfig, SessionConfig, TransportConfig};
pub use constants::{
    DEFAULT_BIND, DEFAULT_PORT, FRAME_FLAG_CHANNEL, FRAME_HEADER_SIZE, MESSAGE_TYPE_SIZE, MSG_ACK,
    MSG_CHAT, MSG_FINALE, MSG_HANDSHAKE, MSG_NONE, MSG_PACKET, NETBUFFER_MAXSIZE,
};
pub use ids::{Channel, PlayerId};
