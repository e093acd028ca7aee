//! # Network Buffer
//!
//! The in-flight message of one connection: the next message to send, or
//! the one just received.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────┬──────────────────────────────────────────┐
//! │ type (1) │ payload (length bytes)                   │
//! └──────────┴──────────────────────────────────────────┘
//!  msg[0]     msg[1..=length]
//! ```
//!
//! `length` counts payload bytes only; the type tag is metadata.

use netmsg_core::{CodecResult, Reader, Writer};
use netmsg_shared::{Channel, PlayerId, MESSAGE_TYPE_SIZE, MSG_NONE};

/// Fixed-capacity message buffer.
///
/// Owned by a [`MessageSession`](crate::MessageSession); everything else
/// only ever sees it through a shared reference.
#[derive(Clone, Debug)]
pub struct NetBuffer {
    /// Sender of an inbound message, destination of an outbound one.
    player: PlayerId,
    /// Delivery channel.
    channel: Channel,
    /// Payload length (type tag excluded).
    length: usize,
    /// Raw message bytes, type tag first.
    msg: Box<[u8]>,
}

impl NetBuffer {
    /// Creates an empty buffer holding messages of up to `capacity` bytes.
    ///
    /// The capacity is raised to at least the size of the type tag.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            player: PlayerId::default(),
            channel: Channel::default(),
            length: 0,
            msg: vec![MSG_NONE; capacity.max(MESSAGE_TYPE_SIZE)].into_boxed_slice(),
        }
    }

    /// Returns the maximum message size, type tag included.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.msg.len()
    }

    /// Returns the player tag.
    #[inline]
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// Sets the player tag.
    #[inline]
    pub fn set_player(&mut self, player: PlayerId) {
        self.player = player;
    }

    /// Returns the channel.
    #[inline]
    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Sets the channel.
    #[inline]
    pub fn set_channel(&mut self, channel: Channel) {
        self.channel = channel;
    }

    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Returns the message type tag.
    #[inline]
    #[must_use]
    pub fn msg_type(&self) -> u8 {
        self.msg[0]
    }

    /// Returns true if the buffer holds no message.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.msg_type() == MSG_NONE && self.length == 0
    }

    /// Returns the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.msg[MESSAGE_TYPE_SIZE..MESSAGE_TYPE_SIZE + self.length]
    }

    /// Returns the whole message: type tag followed by the payload.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &[u8] {
        &self.msg[..MESSAGE_TYPE_SIZE + self.length]
    }

    /// Returns a reader over the payload, sharing the buffer's storage.
    #[must_use]
    pub fn reader(&self) -> Reader<'_> {
        Reader::new(self.payload())
    }

    /// Replaces the contents with `message` (type tag first).
    ///
    /// An empty `message` clears the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`](netmsg_core::CodecError::Overflow)
    /// if `message` exceeds the capacity; the buffer is left unchanged.
    pub fn fill(&mut self, message: &[u8]) -> CodecResult<()> {
        if message.is_empty() {
            self.clear();
            return Ok(());
        }
        let mut writer = Writer::fixed(&mut self.msg);
        writer.write_block(message)?;
        self.length = message.len() - MESSAGE_TYPE_SIZE;
        Ok(())
    }

    /// Empties the buffer.
    pub fn clear(&mut self) {
        self.msg[0] = MSG_NONE;
        self.length = 0;
    }
}
