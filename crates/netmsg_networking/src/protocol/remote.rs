//! Remote file feed queries.

use std::any::Any;

use netmsg_core::{CodecError, CodecResult, Reader, Writer};

use super::{read_header, Packet, PacketId, PacketType};

/// What a remote feed query asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum QueryType {
    /// List the entries of a folder.
    ListFiles = 0,
    /// Fetch the contents of a file.
    FileContents = 1,
}

impl TryFrom<u8> for QueryType {
    type Error = CodecError;

    fn try_from(tag: u8) -> CodecResult<Self> {
        match tag {
            0 => Ok(Self::ListFiles),
            1 => Ok(Self::FileContents),
            tag => Err(CodecError::InvalidTag { tag }),
        }
    }
}

/// A query for a path on a remote file feed.
///
/// Body: query byte, then the path as a string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFeedQueryPacket {
    id: PacketId,
    query: QueryType,
    path: String,
}

impl RemoteFeedQueryPacket {
    /// Type code `RFQu`.
    pub const TYPE: PacketType = PacketType(*b"RFQu");

    /// Creates a query with a fresh id.
    #[must_use]
    pub fn new(query: QueryType, path: impl Into<String>) -> Self {
        Self {
            id: PacketId::next(),
            query,
            path: path.into(),
        }
    }

    /// Returns the query type.
    #[must_use]
    pub const fn query(&self) -> QueryType {
        self.query
    }

    /// Returns the path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parses a packet.
    ///
    /// Returns `None` if the block is not a well-formed query.
    #[must_use]
    pub fn parse(block: &[u8]) -> Option<Self> {
        let mut reader = Reader::new(block);
        let id = read_header(&mut reader, Self::TYPE)?;
        let query = QueryType::try_from(reader.read_u8().ok()?).ok()?;
        let path = reader.read_string().ok()?.to_owned();
        if !reader.at_end() {
            return None;
        }
        Some(Self { id, query, path })
    }

    /// [`Constructor`](super::Constructor) for the protocol registry.
    #[must_use]
    pub fn construct(block: &[u8]) -> Option<Box<dyn Packet>> {
        Self::parse(block).map(|packet| Box::new(packet) as Box<dyn Packet>)
    }
}

impl Packet for RemoteFeedQueryPacket {
    fn packet_type(&self) -> PacketType {
        Self::TYPE
    }

    fn id(&self) -> PacketId {
        self.id
    }

    fn encode_body(&self, writer: &mut Writer<'_>) -> CodecResult<()> {
        writer.write_u8(self.query as u8)?;
        writer.write_string(&self.path)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
