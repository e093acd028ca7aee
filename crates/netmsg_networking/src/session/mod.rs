//! # Message Session
//!
//! Assembles outbound messages and exposes inbound ones, one connection at
//! a time.
//!
//! ## State Machine
//!
//! ```text
//!              begin                      begin (nested: push current)
//!   ┌──────┐ ───────────► ┌─────────┐ ◄──────────────┐
//!   │ Idle │              │ Writing │ ───────────────┘
//!   └──────┘ ◄─────────── └─────────┘
//!      │ ▲   end (stack empty)  │  end (stack not empty: pop and resume)
//!      │ │                      │
//!      │ │ end_read             │ begin_read (implicit end)
//!      ▼ │                      ▼
//!   ┌─────────┐ ◄───────────────┘
//!   │ Reading │ ── begin (implicit end_read) ──► Writing
//!   └─────────┘
//! ```
//!
//! Only two transitions happen implicitly, both through
//! [`ImplicitTransition`]: `begin` ends an open read, and `begin_read` ends
//! the current write.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut session = MessageSession::new(&config.session);
//! session.begin(5)?.write_i32(-1)?;
//! session.writer()?.write_f32(3.5)?;
//! session.end()?;
//! ```

mod guard;
mod shared;

pub use guard::MessageGuard;
pub use shared::SharedSession;

use netmsg_core::{BufferPool, Reader, Writer};
use netmsg_shared::{Channel, PlayerId, SessionConfig, MSG_NONE};

use crate::buffer::NetBuffer;
use crate::error::{SessionError, SessionResult};
use crate::message::Message;
use crate::transport::Transport;

/// Writers larger than this are not kept by the pool.
const MAX_POOLED_CAPACITY: usize = 64 * 1024;

/// Observable session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Neither writing nor reading.
    Idle,
    /// A writer is current.
    Writing,
    /// The network buffer is being read.
    Reading,
}

/// The two transitions a session performs on the caller's behalf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImplicitTransition {
    /// `begin` while reading ends the read first.
    EndReadForWrite,
    /// `begin_read` while writing ends the write first.
    EndWriteForRead,
}

/// Session counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Messages completed by `end`.
    pub messages_sent: u64,
    /// Messages loaded into the network buffer from outside.
    pub messages_received: u64,
    /// Inbound messages that failed to decode.
    pub messages_dropped: u64,
    /// `begin` calls that suspended an unfinished writer.
    pub nested_begins: u64,
    /// Implicit transitions performed.
    pub implicit_transitions: u64,
    /// Writes abandoned through `cancel` or a dropped guard.
    pub cancelled: u64,
}

/// Per-connection message assembly and disassembly.
///
/// Owns the [`NetBuffer`]; all access to it goes through `begin`/`end`
/// and `begin_read`/`end_read`.
pub struct MessageSession {
    buffer: NetBuffer,
    /// Writer accepting typed writes.
    current: Option<Writer<'static>>,
    /// Suspended writers, most recent last.
    pending: Vec<Writer<'static>>,
    reading: bool,
    pool: BufferPool,
    transport: Option<Box<dyn Transport>>,
    destination: PlayerId,
    channel: Channel,
    stats: SessionStats,
}

impl MessageSession {
    /// Creates a session without a transport.
    ///
    /// Finished messages stay in the network buffer until overwritten.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            buffer: NetBuffer::new(config.max_message_size),
            current: None,
            pending: Vec::new(),
            reading: false,
            pool: BufferPool::new(
                config.writer_pool_size,
                config.initial_writer_capacity,
                MAX_POOLED_CAPACITY.max(config.initial_writer_capacity),
            ),
            transport: None,
            destination: PlayerId::SERVER,
            channel: Channel::Reliable,
            stats: SessionStats::default(),
        }
    }

    /// Creates a session that hands every finished message to `transport`.
    #[must_use]
    pub fn with_transport(config: &SessionConfig, transport: impl Transport + 'static) -> Self {
        let mut session = Self::new(config);
        session.transport = Some(Box::new(transport));
        session
    }

    /// Attaches a transport, returning the previous one.
    pub fn attach_transport(
        &mut self,
        transport: Box<dyn Transport>,
    ) -> Option<Box<dyn Transport>> {
        self.transport.replace(transport)
    }

    /// Detaches the transport.
    pub fn detach_transport(&mut self) -> Option<Box<dyn Transport>> {
        self.transport.take()
    }

    /// Sets the destination and channel stamped on finished messages.
    pub fn set_route(&mut self, destination: PlayerId, channel: Channel) {
        self.destination = destination;
        self.channel = channel;
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.reading {
            SessionState::Reading
        } else if self.current.is_some() {
            SessionState::Writing
        } else {
            SessionState::Idle
        }
    }

    /// Returns true if a writer is current.
    #[inline]
    #[must_use]
    pub fn is_writing(&self) -> bool {
        self.current.is_some()
    }

    /// Returns true if a read is open.
    #[inline]
    #[must_use]
    pub const fn is_reading(&self) -> bool {
        self.reading
    }

    /// Returns the number of suspended writers.
    #[inline]
    #[must_use]
    pub fn pending_depth(&self) -> usize {
        self.pending.len()
    }

    /// Returns the network buffer.
    #[inline]
    #[must_use]
    pub const fn buffer(&self) -> &NetBuffer {
        &self.buffer
    }

    /// Returns the counters.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> SessionStats {
        self.stats
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Starts a message of type `msg_type`.
    ///
    /// An open read is ended first. An unfinished writer is suspended and
    /// resumes when this message ends.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Codec`] if the buffer cannot hold even the
    /// type tag; the session is left as it was.
    pub fn begin(&mut self, msg_type: u8) -> SessionResult<&mut Writer<'static>> {
        if self.reading {
            self.apply_implicit(ImplicitTransition::EndReadForWrite)?;
        }
        let mut writer = self.pool.acquire(self.buffer.capacity());
        if let Err(err) = writer.write_u8(msg_type) {
            self.pool.release(writer.into_vec());
            return Err(err.into());
        }
        if let Some(suspended) = self.current.take() {
            self.stats.nested_begins += 1;
            tracing::debug!(
                "Suspending message type {} ({} bytes) for type {}",
                suspended.data()[0],
                suspended.size(),
                msg_type
            );
            self.pending.push(suspended);
        }
        tracing::trace!("Begin message type {} (depth {})", msg_type, self.pending.len());
        Ok(self.current.insert(writer))
    }

    /// Returns the current writer.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotWriting`] if no message is being written.
    pub fn writer(&mut self) -> SessionResult<&mut Writer<'static>> {
        let state = self.state();
        match self.current {
            Some(ref mut writer) => Ok(writer),
            None => Err(misuse(state, "writer")),
        }
    }

    /// Finishes the current message.
    ///
    /// The message is copied into the network buffer, stamped with the
    /// route, and handed to the transport if one is attached. The most
    /// recently suspended writer, if any, becomes current again.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotWriting`] if no message is being written.
    /// - [`SessionError::Codec`] if the message exceeds the network buffer;
    ///   the writer stays current.
    /// - [`SessionError::Transport`] if the transport rejects the message;
    ///   the message is still in the network buffer.
    pub fn end(&mut self) -> SessionResult<()> {
        let Some(writer) = self.current.take() else {
            return Err(misuse(self.state(), "end"));
        };
        if let Err(err) = self.buffer.fill(writer.data()) {
            self.current = Some(writer);
            return Err(err.into());
        }
        self.buffer.set_player(self.destination);
        self.buffer.set_channel(self.channel);
        self.stats.messages_sent += 1;
        tracing::trace!(
            "End message type {} ({} payload bytes)",
            self.buffer.msg_type(),
            self.buffer.length()
        );
        self.pool.release(writer.into_vec());
        self.resume_pending();

        if let Some(transport) = self.transport.as_mut() {
            transport.send(&self.buffer)?;
        }
        Ok(())
    }

    /// Abandons the current message and resumes the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotWriting`] if no message is being written.
    pub fn cancel(&mut self) -> SessionResult<()> {
        let Some(writer) = self.current.take() else {
            return Err(misuse(self.state(), "cancel"));
        };
        self.discard(writer);
        Ok(())
    }

    /// Starts a message whose writer is released when the guard drops.
    ///
    /// Call [`MessageGuard::finish`] to end it; dropping the guard cancels
    /// it instead.
    ///
    /// # Errors
    ///
    /// As [`begin`](Self::begin).
    pub fn begin_scoped(&mut self, msg_type: u8) -> SessionResult<MessageGuard<'_>> {
        self.begin(msg_type)?;
        let Some(writer) = self.current.take() else {
            return Err(misuse(self.state(), "begin_scoped"));
        };
        Ok(MessageGuard::new(self, writer))
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Opens the network buffer for reading.
    ///
    /// A message being written is ended first. If that resumes a suspended
    /// writer, it stays suspended until [`end_read`](Self::end_read).
    ///
    /// # Errors
    ///
    /// Returns the error of the implicit `end`.
    pub fn begin_read(&mut self) -> SessionResult<Reader<'_>> {
        if self.current.is_some() {
            self.apply_implicit(ImplicitTransition::EndWriteForRead)?;
        }
        self.reading = true;
        tracing::trace!(
            "Begin read of message type {} ({} bytes)",
            self.buffer.msg_type(),
            self.buffer.length()
        );
        Ok(self.buffer.reader())
    }

    /// Closes the read. Does nothing if no read is open.
    pub fn end_read(&mut self) {
        if !self.reading {
            return;
        }
        self.reading = false;
        if self.current.is_none() {
            self.resume_pending();
        }
        tracing::trace!("End read");
    }

    /// Loads an inbound message into the network buffer.
    ///
    /// For transports driven outside the session. An open read is ended.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Codec`] if `message` exceeds the buffer.
    pub fn deliver(
        &mut self,
        from: PlayerId,
        channel: Channel,
        message: &[u8],
    ) -> SessionResult<()> {
        self.end_read();
        self.buffer.fill(message)?;
        self.buffer.set_player(from);
        self.buffer.set_channel(channel);
        self.stats.messages_received += 1;
        Ok(())
    }

    /// Pulls the next inbound message from the transport.
    ///
    /// Returns `Ok(false)` if nothing is waiting or no transport is
    /// attached. An open read is ended.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] if the transport fails.
    pub fn receive(&mut self) -> SessionResult<bool> {
        self.end_read();
        let Some(transport) = self.transport.as_mut() else {
            return Ok(false);
        };
        let received = transport.receive(&mut self.buffer)?;
        if received {
            self.stats.messages_received += 1;
        }
        Ok(received)
    }

    // =========================================================================
    // Typed messages
    // =========================================================================

    /// Encodes and ends `message` as one unit.
    ///
    /// If encoding fails the partial message is cancelled.
    ///
    /// # Errors
    ///
    /// Returns the encoding error or the error of `end`.
    pub fn send_message<M: Message>(&mut self, message: &M) -> SessionResult<()> {
        let mut guard = self.begin_scoped(message.message_type())?;
        message.encode(&mut guard)?;
        guard.finish()
    }

    /// Decodes the message in the network buffer.
    ///
    /// Returns `Ok(None)` for an empty buffer. A message that fails to
    /// decode is logged and dropped, also yielding `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the error of the implicit `end` if a write was open.
    pub fn read_message<M: Message>(&mut self) -> SessionResult<Option<M>> {
        // An open write is ended here, replacing the buffer contents.
        self.begin_read()?;
        let msg_type = self.buffer.msg_type();
        let decoded = if msg_type == MSG_NONE {
            None
        } else {
            Some(M::decode(msg_type, &mut self.buffer.reader()))
        };
        self.end_read();
        match decoded {
            None => Ok(None),
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(err)) => {
                self.stats.messages_dropped += 1;
                tracing::warn!(
                    "Dropping message type {} from {} ({} payload bytes): {}",
                    msg_type,
                    self.buffer.player(),
                    self.buffer.length(),
                    err
                );
                Ok(None)
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn apply_implicit(&mut self, transition: ImplicitTransition) -> SessionResult<()> {
        self.stats.implicit_transitions += 1;
        tracing::debug!("Implicit transition: {:?}", transition);
        match transition {
            ImplicitTransition::EndReadForWrite => {
                self.end_read();
                Ok(())
            }
            ImplicitTransition::EndWriteForRead => {
                self.end()?;
                if let Some(resumed) = self.current.take() {
                    self.pending.push(resumed);
                }
                Ok(())
            }
        }
    }

    fn resume_pending(&mut self) {
        if let Some(resumed) = self.pending.pop() {
            tracing::trace!(
                "Resuming message type {} at {} bytes",
                resumed.data()[0],
                resumed.size()
            );
            self.current = Some(resumed);
        }
    }

    /// Releases `writer` without sending it.
    fn discard(&mut self, writer: Writer<'static>) {
        self.stats.cancelled += 1;
        tracing::debug!(
            "Cancelled message type {} ({} bytes)",
            writer.data()[0],
            writer.size()
        );
        self.pool.release(writer.into_vec());
        self.resume_pending();
    }
}

fn misuse(state: SessionState, operation: &'static str) -> SessionError {
    tracing::error!(
        "{} called in state {:?} with no active writer",
        operation,
        state
    );
    SessionError::NotWriting { operation }
}

impl std::fmt::Debug for MessageSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSession")
            .field("state", &self.state())
            .field("pending", &self.pending.len())
            .field("buffer", &self.buffer)
            .field("transport", &self.transport.is_some())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netmsg_core::CodecError;

    fn session() -> MessageSession {
        MessageSession::new(&SessionConfig::default())
    }

    #[test]
    fn test_initial_state() {
        let session = session();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_writing());
        assert!(session.buffer().is_empty());
    }

    #[test]
    fn test_begin_writes_type_tag() {
        let mut session = session();
        let writer = session.begin(9).unwrap();
        assert_eq!(writer.data(), &[9]);
        assert_eq!(session.state(), SessionState::Writing);
    }

    #[test]
    fn test_end_without_begin_is_reported() {
        let mut session = session();
        let err = session.end().unwrap_err();
        assert!(matches!(err, SessionError::NotWriting { operation: "end" }));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_writer_without_begin_is_reported() {
        let mut session = session();
        assert!(matches!(
            session.writer(),
            Err(SessionError::NotWriting { operation: "writer" })
        ));
    }

    #[test]
    fn test_nested_begin_suspends_outer() {
        let mut session = session();
        session.begin(1).unwrap().write_u8(0xA).unwrap();
        session.begin(2).unwrap().write_u8(0xB).unwrap();
        assert_eq!(session.pending_depth(), 1);

        session.end().unwrap();
        assert_eq!(session.buffer().message(), &[2, 0xB]);
        assert_eq!(session.writer().unwrap().data(), &[1, 0xA]);
        assert_eq!(session.pending_depth(), 0);
        assert_eq!(session.stats().nested_begins, 1);
    }

    #[test]
    fn test_cancel_resumes_outer() {
        let mut session = session();
        session.begin(1).unwrap().write_u8(1).unwrap();
        session.begin(2).unwrap().write_u8(2).unwrap();
        session.cancel().unwrap();
        assert_eq!(session.writer().unwrap().data(), &[1, 1]);
        session.end().unwrap();
        assert_eq!(session.buffer().message(), &[1, 1]);
        assert_eq!(session.stats().cancelled, 1);
    }

    #[test]
    fn test_cancel_without_begin_is_reported() {
        let mut session = session();
        assert!(matches!(
            session.cancel(),
            Err(SessionError::NotWriting { operation: "cancel" })
        ));
    }

    #[test]
    fn test_begin_read_ends_write() {
        let mut session = session();
        session.begin(4).unwrap().write_u16(0x0102).unwrap();
        let mut reader = session.begin_read().unwrap();
        assert_eq!(reader.read_u16().unwrap(), 0x0102);
        assert_eq!(session.state(), SessionState::Reading);
        assert_eq!(session.stats().implicit_transitions, 1);
        session.end_read();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_begin_read_keeps_resumed_writer_suspended() {
        let mut session = session();
        session.begin(1).unwrap().write_u8(0x11).unwrap();
        session.begin(2).unwrap().write_u8(0x22).unwrap();

        let mut reader = session.begin_read().unwrap();
        assert_eq!(reader.read_u8().unwrap(), 0x22);
        assert_eq!(session.state(), SessionState::Reading);
        assert_eq!(session.pending_depth(), 1);

        session.end_read();
        assert_eq!(session.state(), SessionState::Writing);
        assert_eq!(session.writer().unwrap().data(), &[1, 0x11]);
    }

    #[test]
    fn test_begin_ends_read() {
        let mut session = session();
        session.deliver(PlayerId(4), Channel::Reliable, &[3, 1]).unwrap();
        let _ = session.begin_read().unwrap();
        session.begin(6).unwrap();
        assert_eq!(session.state(), SessionState::Writing);
        assert_eq!(session.stats().implicit_transitions, 1);
    }

    #[test]
    fn test_end_read_is_idempotent() {
        let mut session = session();
        session.end_read();
        session.end_read();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_overflow_at_network_buffer_limit() {
        let config = SessionConfig {
            max_message_size: 4,
            ..SessionConfig::default()
        };
        let mut session = MessageSession::new(&config);
        let writer = session.begin(1).unwrap();
        writer.write_u8(1).unwrap();
        writer.write_u16(2).unwrap();
        assert_eq!(
            writer.write_u8(3),
            Err(CodecError::Overflow { requested: 1, available: 0 })
        );
        assert_eq!(writer.data(), &[1, 1, 2, 0]);
        session.end().unwrap();
        assert_eq!(session.buffer().length(), 3);
    }

    #[test]
    fn test_end_stamps_route() {
        let mut session = session();
        session.set_route(PlayerId(8), Channel::Unreliable);
        session.begin(1).unwrap();
        session.end().unwrap();
        assert_eq!(session.buffer().player(), PlayerId(8));
        assert_eq!(session.buffer().channel(), Channel::Unreliable);
    }

    #[test]
    fn test_writers_are_pooled() {
        let mut session = session();
        for _ in 0..3 {
            session.begin(1).unwrap().write_u32(7).unwrap();
            session.end().unwrap();
        }
        assert_eq!(session.pool.allocated_count(), 1);
        assert_eq!(session.pool.reused_count(), 2);
    }

    #[test]
    fn test_receive_without_transport() {
        let mut session = session();
        assert!(!session.receive().unwrap());
    }
}
