//! Thread-shared session handle.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::MessageSession;
use crate::error::SessionResult;
use crate::message::Message;

/// A [`MessageSession`] shared between threads.
///
/// Every operation holds the lock for its whole duration, so a nested
/// Begin/End sequence composed inside [`with`](Self::with) cannot
/// interleave with another thread's.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<MessageSession>>,
}

impl SharedSession {
    /// Wraps a session.
    #[must_use]
    pub fn new(session: MessageSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Locks the session.
    pub fn lock(&self) -> MutexGuard<'_, MessageSession> {
        self.inner.lock()
    }

    /// Runs `f` with the session locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut MessageSession) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Sends a typed message.
    ///
    /// # Errors
    ///
    /// As [`MessageSession::send_message`].
    pub fn send_message<M: Message>(&self, message: &M) -> SessionResult<()> {
        self.inner.lock().send_message(message)
    }

    /// Receives and decodes the next inbound message, if any.
    ///
    /// # Errors
    ///
    /// As [`MessageSession::receive`].
    pub fn receive_message<M: Message>(&self) -> SessionResult<Option<M>> {
        let mut session = self.inner.lock();
        if !session.receive()? {
            return Ok(None);
        }
        session.read_message()
    }
}

impl std::fmt::Debug for SharedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSession")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish_non_exhaustive()
    }
}
