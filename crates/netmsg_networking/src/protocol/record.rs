//! # Record Packets
//!
//! Self-describing key/value payloads that tolerate schema evolution.
//!
//! ## Value Encoding
//!
//! | Tag | Value    | Body                                  |
//! |-----|----------|---------------------------------------|
//! | 0   | None     | (empty)                               |
//! | 1   | Number   | f64                                   |
//! | 2   | Text     | u32 length + UTF-8                    |
//! | 3   | Block    | u32 length + bytes                    |
//! | 4   | Array    | u32 count + values                    |
//! | 5   | Record   | u32 count + (u16 key string, value)*  |
//!
//! Record members are written in key order.

use std::any::Any;
use std::collections::BTreeMap;

use netmsg_core::{CodecError, CodecResult, Reader, Writer};

use super::{read_header, Packet, PacketId, PacketType};

/// Deepest nesting of arrays and records accepted.
pub const MAX_RECORD_DEPTH: usize = 32;

const TAG_NONE: u8 = 0;
const TAG_NUMBER: u8 = 1;
const TAG_TEXT: u8 = 2;
const TAG_BLOCK: u8 = 3;
const TAG_ARRAY: u8 = 4;
const TAG_RECORD: u8 = 5;

/// A typed record member.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// No value.
    #[default]
    None,
    /// A number.
    Number(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Block(Vec<u8>),
    /// An ordered list.
    Array(Vec<Value>),
    /// A nested record.
    Record(Record),
}

impl Value {
    /// Returns the number, if this is one.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the nested record, if this is one.
    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    fn encode(&self, writer: &mut Writer<'_>, depth: usize) -> CodecResult<()> {
        match self {
            Self::None => writer.write_u8(TAG_NONE),
            Self::Number(n) => {
                writer.write_u8(TAG_NUMBER)?;
                writer.write_f64(*n)
            }
            Self::Text(text) => {
                writer.write_u8(TAG_TEXT)?;
                writer.write_sized_block(text.as_bytes())
            }
            Self::Block(bytes) => {
                writer.write_u8(TAG_BLOCK)?;
                writer.write_sized_block(bytes)
            }
            Self::Array(items) => {
                let depth = descend(depth)?;
                writer.write_u8(TAG_ARRAY)?;
                writer.write_u32(count(items.len())?)?;
                items.iter().try_for_each(|item| item.encode(writer, depth))
            }
            Self::Record(record) => {
                writer.write_u8(TAG_RECORD)?;
                record.encode_at(writer, depth)
            }
        }
    }

    fn decode(reader: &mut Reader<'_>, depth: usize) -> CodecResult<Self> {
        match reader.read_u8()? {
            TAG_NONE => Ok(Self::None),
            TAG_NUMBER => Ok(Self::Number(reader.read_f64()?)),
            TAG_TEXT => {
                let bytes = reader.read_sized_block()?;
                let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
                Ok(Self::Text(text.to_owned()))
            }
            TAG_BLOCK => Ok(Self::Block(reader.read_sized_block()?.to_vec())),
            TAG_ARRAY => {
                let depth = descend(depth)?;
                let len = read_count(reader)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(Self::decode(reader, depth)?);
                }
                Ok(Self::Array(items))
            }
            TAG_RECORD => Ok(Self::Record(Record::decode_at(reader, depth)?)),
            tag => Err(CodecError::InvalidTag { tag }),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Block(bytes)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

fn descend(depth: usize) -> CodecResult<usize> {
    if depth >= MAX_RECORD_DEPTH {
        return Err(CodecError::NestingTooDeep {
            limit: MAX_RECORD_DEPTH,
        });
    }
    Ok(depth + 1)
}

fn count(len: usize) -> CodecResult<u32> {
    u32::try_from(len).map_err(|_| CodecError::OutOfRange {
        value: len as u64,
        max: u64::from(u32::MAX),
    })
}

/// Reads an element count, rejecting counts the remaining bytes cannot hold.
fn read_count(reader: &mut Reader<'_>) -> CodecResult<usize> {
    let start = reader.position();
    let len = reader.read_u32()? as usize;
    // Every element takes at least one byte.
    if len > reader.remaining() {
        let available = reader.remaining();
        reader.seek(start)?;
        return Err(CodecError::Underrun {
            requested: len,
            available,
        });
    }
    Ok(len)
}

/// An ordered key to value mapping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    members: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            members: BTreeMap::new(),
        }
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the record has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Sets a member, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.members.insert(key.into(), value.into())
    }

    /// Returns a member.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.members.get(key)
    }

    /// Returns true if the member exists.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.members.contains_key(key)
    }

    /// Removes a member.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.members.remove(key)
    }

    /// Iterates members in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Writes the record.
    ///
    /// # Errors
    ///
    /// Returns the writer's error, or [`CodecError::NestingTooDeep`] past
    /// [`MAX_RECORD_DEPTH`].
    pub fn encode(&self, writer: &mut Writer<'_>) -> CodecResult<()> {
        self.encode_at(writer, 0)
    }

    /// Reads a record.
    ///
    /// # Errors
    ///
    /// Returns the reader's error, [`CodecError::InvalidTag`] for an
    /// unknown value tag, or [`CodecError::NestingTooDeep`].
    pub fn decode(reader: &mut Reader<'_>) -> CodecResult<Self> {
        Self::decode_at(reader, 0)
    }

    fn encode_at(&self, writer: &mut Writer<'_>, depth: usize) -> CodecResult<()> {
        let depth = descend(depth)?;
        writer.write_u32(count(self.members.len())?)?;
        for (key, value) in &self.members {
            writer.write_string(key)?;
            value.encode(writer, depth)?;
        }
        Ok(())
    }

    fn decode_at(reader: &mut Reader<'_>, depth: usize) -> CodecResult<Self> {
        let depth = descend(depth)?;
        let len = read_count(reader)?;
        let mut members = BTreeMap::new();
        for _ in 0..len {
            let key = reader.read_string()?.to_owned();
            let value = Value::decode(reader, depth)?;
            members.insert(key, value);
        }
        Ok(Self { members })
    }
}

/// A named record carried as a packet.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordPacket {
    id: PacketId,
    name: String,
    record: Record,
}

impl RecordPacket {
    /// Type code `RECO`.
    pub const TYPE: PacketType = PacketType(*b"RECO");

    /// Creates a packet with an empty record and a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_record(name, Record::new())
    }

    /// Creates a packet owning `record`.
    #[must_use]
    pub fn with_record(name: impl Into<String>, record: Record) -> Self {
        Self {
            id: PacketId::next(),
            name: name.into(),
            record,
        }
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the record.
    #[must_use]
    pub const fn record(&self) -> &Record {
        &self.record
    }

    /// Returns the record for modification.
    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    /// Takes the record out, leaving an empty one.
    pub fn take(&mut self) -> Record {
        std::mem::take(&mut self.record)
    }

    /// Replaces the record.
    pub fn give(&mut self, record: Record) {
        self.record = record;
    }

    /// Parses a packet.
    ///
    /// Returns `None` if the block is not a well-formed record packet.
    #[must_use]
    pub fn parse(block: &[u8]) -> Option<Self> {
        let mut reader = Reader::new(block);
        let id = read_header(&mut reader, Self::TYPE)?;
        let name = reader.read_string().ok()?.to_owned();
        let record = Record::decode(&mut reader).ok()?;
        if !reader.at_end() {
            return None;
        }
        Some(Self { id, name, record })
    }

    /// [`Constructor`](super::Constructor) for the protocol registry.
    #[must_use]
    pub fn construct(block: &[u8]) -> Option<Box<dyn Packet>> {
        Self::parse(block).map(|packet| Box::new(packet) as Box<dyn Packet>)
    }
}

impl Packet for RecordPacket {
    fn packet_type(&self) -> PacketType {
        Self::TYPE
    }

    fn id(&self) -> PacketId {
        self.id
    }

    fn encode_body(&self, writer: &mut Writer<'_>) -> CodecResult<()> {
        writer.write_string(&self.name)?;
        self.record.encode(writer)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
