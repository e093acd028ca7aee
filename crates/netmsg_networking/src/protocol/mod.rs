//! # Packet Protocol
//!
//! Self-identifying packets and the registry that recognizes them.
//!
//! ## Packet Layout
//!
//! ```text
//! ┌──────────────────┬──────────────┬──────────────────────┐
//! │ type code [u8;4] │ id u32 LE    │ body (per packet)    │
//! └──────────────────┴──────────────┴──────────────────────┘
//! ```
//!
//! A [`Protocol`] holds constructor functions. [`Protocol::interpret`]
//! tries them in registration order and returns the first packet built.
//! A block nobody recognizes yields `None`; newer peers may send packets
//! older ones do not know.

mod record;
mod remote;

pub use record::{Record, RecordPacket, Value, MAX_RECORD_DEPTH};
pub use remote::{QueryType, RemoteFeedQueryPacket};

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use netmsg_core::{CodecResult, Reader, Writer};

/// Four-character packet type code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketType(pub [u8; 4]);

impl fmt::Debug for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PacketType({self})")
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            if byte.is_ascii_graphic() {
                write!(f, "{}", char::from(byte))?;
            } else {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

/// Packet identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PacketId(pub u32);

static NEXT_PACKET_ID: AtomicU32 = AtomicU32::new(1);

impl PacketId {
    /// Returns a fresh process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_PACKET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A self-identifying unit of application data.
pub trait Packet: fmt::Debug + Send {
    /// Returns the type code.
    fn packet_type(&self) -> PacketType;

    /// Returns the identifier.
    fn id(&self) -> PacketId;

    /// Writes the body (everything after the header).
    ///
    /// # Errors
    ///
    /// Returns the writer's error if the body does not fit.
    fn encode_body(&self, writer: &mut Writer<'_>) -> CodecResult<()>;

    /// Returns `self` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Converts the box for downcasting.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl dyn Packet {
    /// Returns true if the packet is a `T`.
    #[must_use]
    pub fn is<T: Packet + 'static>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Borrows the packet as a `T`.
    #[must_use]
    pub fn downcast_ref<T: Packet + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Takes the packet as a `T`.
    ///
    /// Returns `None`, dropping the packet, if it is not a `T`. Check with
    /// [`is`](Self::is) first to keep it.
    #[must_use]
    pub fn downcast<T: Packet + 'static>(self: Box<Self>) -> Option<Box<T>> {
        self.into_any().downcast::<T>().ok()
    }
}

/// Serializes a packet with its header.
///
/// # Errors
///
/// Returns the writer's error if the packet does not fit.
pub fn encode_packet(packet: &dyn Packet, writer: &mut Writer<'_>) -> CodecResult<()> {
    writer.write_block(&packet.packet_type().0)?;
    writer.write_u32(packet.id().0)?;
    packet.encode_body(writer)
}

/// Serializes a packet into a new byte vector.
///
/// # Errors
///
/// As [`encode_packet`].
pub fn packet_to_vec(packet: &dyn Packet) -> CodecResult<Vec<u8>> {
    let mut writer = Writer::new();
    encode_packet(packet, &mut writer)?;
    Ok(writer.into_vec())
}

/// Reads a packet header, checking the type code.
///
/// Returns `None` without consuming anything if the block is too short or
/// carries another type code.
pub fn read_header(reader: &mut Reader<'_>, expected: PacketType) -> Option<PacketId> {
    let start = reader.position();
    let id = match reader.read_block(4) {
        Ok(code) if code == expected.0 => reader.read_u32().ok(),
        _ => None,
    };
    if id.is_none() {
        reader.seek(start).ok()?;
    }
    id.map(PacketId)
}

/// Builds a packet from a byte block, or returns `None` if the block is
/// not of its kind.
pub type Constructor = fn(&[u8]) -> Option<Box<dyn Packet>>;

/// An ordered packet constructor registry.
#[derive(Clone, Default)]
pub struct Protocol {
    constructors: Vec<Constructor>,
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protocol")
            .field("constructors", &self.constructors.len())
            .finish()
    }
}

impl Protocol {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            constructors: Vec::new(),
        }
    }

    /// Creates a registry knowing every packet of this crate.
    #[must_use]
    pub fn with_builtin_packets() -> Self {
        let mut protocol = Self::new();
        protocol.define_constructor(RecordPacket::construct);
        protocol.define_constructor(RemoteFeedQueryPacket::construct);
        protocol
    }

    /// Registers a constructor after all existing ones.
    pub fn define_constructor(&mut self, constructor: Constructor) {
        self.constructors.push(constructor);
    }

    /// Returns the number of registered constructors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Returns true if no constructor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Builds a packet with the first constructor that recognizes `block`.
    #[must_use]
    pub fn interpret(&self, block: &[u8]) -> Option<Box<dyn Packet>> {
        let packet = self
            .constructors
            .iter()
            .find_map(|construct| construct(block));
        if packet.is_none() {
            tracing::debug!("Unrecognized packet of {} bytes", block.len());
        }
        packet
    }
}
