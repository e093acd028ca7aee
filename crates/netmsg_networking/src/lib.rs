//! # NETMSG Networking
//!
//! Message sessions, packet dispatch and transports.
//!
//! ## Architecture
//!
//! - **Network Buffer**: the in-flight message of one connection
//! - **Message Session**: Begin/End write sessions with a pending writer
//!   stack, BeginRead/EndRead read sessions over the network buffer
//! - **Messages**: typed engine messages with matched encode/decode
//! - **Protocol**: self-identifying packets and an ordered constructor
//!   registry
//! - **Transport**: in-process channels, TCP links, a listen socket
//!
//! ## Message Flow
//!
//! ```text
//! SENDER                                         RECEIVER
//!   begin(type) ─► write_*() ─► end()
//!                                 │
//!                          NetBuffer ─► Transport ─► NetBuffer
//!                                                        │
//!                                  begin_read() ─► read_*() ─► end_read()
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use netmsg_networking::{ChannelTransport, MessageSession};
//! use netmsg_shared::{PlayerId, SessionConfig};
//!
//! let config = SessionConfig::default();
//! let (a, b) = ChannelTransport::pair(PlayerId(1), PlayerId(2), 64);
//! let mut alice = MessageSession::with_transport(&config, a);
//! let mut bob = MessageSession::with_transport(&config, b);
//!
//! alice.begin(5)?.write_i32(-1)?;
//! alice.end()?;
//!
//! bob.receive()?;
//! let value = bob.begin_read()?.read_i32()?;
//! bob.end_read();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod buffer;
pub mod error;
pub mod message;
pub mod protocol;
pub mod session;
pub mod transport;

pub use buffer::NetBuffer;
pub use error::{NetError, NetResult, SessionError, SessionResult};
pub use message::{EngineMessage, Message};
pub use protocol::{
    Constructor, Packet, PacketId, PacketType, Protocol, QueryType, Record, RecordPacket,
    RemoteFeedQueryPacket, Value,
};
pub use session::{
    ImplicitTransition, MessageGuard, MessageSession, SessionState, SessionStats, SharedSession,
};
pub use transport::{ChannelTransport, Frame, LinkStats, ListenSocket, TcpLink, Transport};

/// Protocol version sent in the handshake.
pub const PROTOCOL_VERSION: u8 = 1;
