//! Scoped message writes.

use std::ops::{Deref, DerefMut};

use netmsg_core::Writer;

use super::MessageSession;
use crate::error::SessionResult;

/// A message being written that is cancelled unless finished.
///
/// Created by [`MessageSession::begin_scoped`]. Derefs to the writer.
///
/// ```rust,ignore
/// let mut msg = session.begin_scoped(MSG_CHAT)?;
/// msg.write_u32(from.0)?;
/// msg.write_string(text)?; // an early return here cancels the message
/// msg.finish()?;
/// ```
#[must_use = "dropping the guard cancels the message"]
pub struct MessageGuard<'s> {
    session: &'s mut MessageSession,
    writer: Writer<'static>,
    finished: bool,
}

impl<'s> MessageGuard<'s> {
    pub(super) fn new(session: &'s mut MessageSession, writer: Writer<'static>) -> Self {
        Self {
            session,
            writer,
            finished: false,
        }
    }

    /// Returns the message type tag.
    #[must_use]
    pub fn msg_type(&self) -> u8 {
        self.writer.data()[0]
    }

    /// Ends the message, exactly like [`MessageSession::end`].
    ///
    /// # Errors
    ///
    /// As [`MessageSession::end`]. If the message does not fit the network
    /// buffer it is left current on the session.
    pub fn finish(mut self) -> SessionResult<()> {
        self.finished = true;
        let writer = std::mem::take(&mut self.writer);
        self.session.current = Some(writer);
        self.session.end()
    }

    /// Abandons the message.
    pub fn cancel(self) {}
}

impl Deref for MessageGuard<'_> {
    type Target = Writer<'static>;

    fn deref(&self) -> &Self::Target {
        &self.writer
    }
}

impl DerefMut for MessageGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.writer
    }
}

impl Drop for MessageGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let writer = std::mem::take(&mut self.writer);
            self.session.discard(writer);
        }
    }
}
