//! # Transports
//!
//! Carry finished messages between sessions.
//!
//! A transport moves whole messages: [`Transport::send`] takes the network
//! buffer a session just filled, [`Transport::receive`] loads the next
//! inbound message into it. Ordering within a link is preserved.
//!
//! ## Stream Framing
//!
//! Byte-stream transports wrap every message in a frame:
//!
//! ```text
//! ┌────────────────┬───────────┬────────────────────────────┐
//! │ length u32 LE  │ flags u8  │ message (type + payload)   │
//! └────────────────┴───────────┴────────────────────────────┘
//! ```
//!
//! Flag bit 0 carries the [`Channel`].

mod channel;
mod listen;
mod tcp;

pub use channel::ChannelTransport;
pub use listen::ListenSocket;
pub use tcp::{LinkStats, TcpLink};

use netmsg_core::{ByteQueue, CodecError, CodecResult, Writer};
use netmsg_shared::{Channel, PlayerId, FRAME_FLAG_CHANNEL, FRAME_HEADER_SIZE};

use crate::buffer::NetBuffer;
use crate::error::{NetError, NetResult};

/// A message carrier attached to a [`MessageSession`](crate::MessageSession).
pub trait Transport: Send {
    /// Sends the message held in `buffer`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if the link is closed or the queue is full.
    fn send(&mut self, buffer: &NetBuffer) -> NetResult<()>;

    /// Loads the next inbound message into `buffer`.
    ///
    /// Returns `Ok(false)` when nothing is waiting.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Disconnected`] once the link is closed and
    /// drained, or [`NetError::Codec`] if the message does not fit `buffer`.
    fn receive(&mut self, buffer: &mut NetBuffer) -> NetResult<bool>;
}

/// One message in transit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Destination on send, origin on receive.
    pub player: PlayerId,
    /// Delivery channel.
    pub channel: Channel,
    /// Type tag followed by the payload.
    pub message: Vec<u8>,
}

impl Frame {
    /// Copies the message out of a network buffer.
    #[must_use]
    pub fn from_buffer(buffer: &NetBuffer) -> Self {
        Self {
            player: buffer.player(),
            channel: buffer.channel(),
            message: buffer.message().to_vec(),
        }
    }

    /// Loads this frame into a network buffer.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Codec`] if the message exceeds the buffer's
    /// capacity; the buffer keeps its previous contents.
    pub fn load_into(&self, buffer: &mut NetBuffer) -> NetResult<()> {
        buffer.fill(&self.message)?;
        buffer.set_player(self.player);
        buffer.set_channel(self.channel);
        Ok(())
    }

    /// Appends the stream form of this frame.
    ///
    /// Nothing is written if the whole frame does not fit.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if `out` cannot hold the frame, or
    /// [`CodecError::OutOfRange`] if the message length exceeds `u32`.
    pub fn encode(&self, out: &mut Writer<'_>) -> CodecResult<()> {
        let length = u32::try_from(self.message.len()).map_err(|_| CodecError::OutOfRange {
            value: self.message.len() as u64,
            max: u64::from(u32::MAX),
        })?;
        let total = FRAME_HEADER_SIZE + self.message.len();
        if out.would_overflow(total) {
            return Err(CodecError::Overflow {
                requested: total,
                available: out.remaining(),
            });
        }
        out.write_u32(length)?;
        out.write_u8(self.channel.bit())?;
        out.write_block(&self.message)
    }

    /// Takes one complete frame off the front of `queue`.
    ///
    /// The header is inspected without consuming anything; bytes are only
    /// removed once the whole frame is available. Returns `Ok(None)` while
    /// the frame is still incomplete.
    ///
    /// # Arguments
    ///
    /// * `queue` - Received stream bytes
    /// * `origin` - Player to tag the frame with
    /// * `max_message` - Largest acceptable message
    ///
    /// # Errors
    ///
    /// Returns [`NetError::MessageTooLarge`] if the header announces more
    /// than `max_message` bytes. The stream cannot be resynchronized after
    /// that.
    pub fn decode_from(
        queue: &mut ByteQueue,
        origin: PlayerId,
        max_message: usize,
    ) -> NetResult<Option<Self>> {
        if queue.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }
        let (length, flags) = {
            let mut header = queue.reader();
            (header.read_u32()? as usize, header.read_u8()?)
        };
        if length > max_message {
            return Err(NetError::MessageTooLarge {
                size: length,
                limit: max_message,
            });
        }
        if queue.len() < FRAME_HEADER_SIZE + length {
            return Ok(None);
        }
        queue.consume(FRAME_HEADER_SIZE)?;
        let message = queue.take(length)?;
        Ok(Some(Self {
            player: origin,
            channel: Channel::from_bit(flags & FRAME_FLAG_CHANNEL),
            message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(message: &[u8]) -> Frame {
        Frame {
            player: PlayerId(3),
            channel: Channel::Unreliable,
            message: message.to_vec(),
        }
    }

    #[test]
    fn test_encode_layout() {
        let mut out = Writer::new();
        frame(&[5, 0xAA, 0xBB]).encode(&mut out).unwrap();
        assert_eq!(out.data(), &[3, 0, 0, 0, FRAME_FLAG_CHANNEL, 5, 0xAA, 0xBB]);
    }

    #[test]
    fn test_encode_all_or_nothing() {
        let mut storage = [0u8; 6];
        let mut out = Writer::fixed(&mut storage);
        let result = frame(&[5, 1, 2]).encode(&mut out);
        assert!(matches!(result, Err(CodecError::Overflow { .. })));
        assert_eq!(out.size(), 0);
    }

    #[test]
    fn test_decode_waits_for_whole_frame() {
        let mut out = Writer::new();
        frame(&[9, 1, 2, 3]).encode(&mut out).unwrap();
        let bytes = out.into_vec();

        let mut queue = ByteQueue::new();
        queue.push(&bytes[..3]);
        assert_eq!(Frame::decode_from(&mut queue, PlayerId(7), 64).unwrap(), None);
        queue.push(&bytes[3..7]);
        assert_eq!(Frame::decode_from(&mut queue, PlayerId(7), 64).unwrap(), None);
        assert_eq!(queue.len(), 7);

        queue.push(&bytes[7..]);
        let decoded = Frame::decode_from(&mut queue, PlayerId(7), 64).unwrap().unwrap();
        assert_eq!(decoded.player, PlayerId(7));
        assert_eq!(decoded.channel, Channel::Unreliable);
        assert_eq!(decoded.message, vec![9, 1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_decode_two_frames_in_one_chunk() {
        let mut out = Writer::new();
        frame(&[1]).encode(&mut out).unwrap();
        frame(&[2, 2]).encode(&mut out).unwrap();

        let mut queue = ByteQueue::new();
        queue.push(out.data());
        let first = Frame::decode_from(&mut queue, PlayerId(1), 64).unwrap().unwrap();
        let second = Frame::decode_from(&mut queue, PlayerId(1), 64).unwrap().unwrap();
        assert_eq!(first.message, vec![1]);
        assert_eq!(second.message, vec![2, 2]);
        assert_eq!(Frame::decode_from(&mut queue, PlayerId(1), 64).unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_oversized() {
        let mut queue = ByteQueue::new();
        queue.push(&[0xFF, 0xFF, 0x00, 0x00, 0x00]);
        let err = Frame::decode_from(&mut queue, PlayerId(1), 1024).unwrap_err();
        assert!(matches!(err, NetError::MessageTooLarge { size: 0xFFFF, limit: 1024 }));
    }

    #[test]
    fn test_buffer_roundtrip() {
        let mut buffer = NetBuffer::new(32);
        buffer.fill(&[4, 1, 2]).unwrap();
        buffer.set_player(PlayerId(2));
        let frame = Frame::from_buffer(&buffer);

        let mut other = NetBuffer::new(32);
        frame.load_into(&mut other).unwrap();
        assert_eq!(other.message(), buffer.message());
        assert_eq!(other.player(), PlayerId(2));
    }

    #[test]
    fn test_load_into_small_buffer_fails() {
        let mut small = NetBuffer::new(2);
        let err = frame(&[1, 2, 3]).load_into(&mut small).unwrap_err();
        assert!(matches!(err, NetError::Codec(CodecError::Overflow { .. })));
        assert!(small.is_empty());
    }
}
