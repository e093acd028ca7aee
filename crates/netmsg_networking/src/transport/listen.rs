//! # Listen Socket
//!
//! Accepts TCP connections on a background thread and hands them out as
//! [`TcpLink`]s on demand.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use netmsg_shared::{NetConfig, PlayerId};
use parking_lot::Mutex;

use super::TcpLink;
use crate::error::{NetError, NetResult};

type PendingList = Arc<Mutex<VecDeque<(TcpStream, SocketAddr)>>>;

/// A listening socket with a pending-connection list.
pub struct ListenSocket {
    local_addr: SocketAddr,
    pending: PendingList,
    running: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
    last_player: u32,
    config: NetConfig,
}

impl ListenSocket {
    /// Binds to `config.transport.bind` and starts accepting.
    ///
    /// Binding to port 0 picks a free port; see [`local_addr`](Self::local_addr).
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Config`](crate::NetError::Config) for an
    /// unparsable bind address, [`NetError::Io`](crate::NetError::Io) if
    /// the socket cannot be bound.
    pub fn bind(config: &NetConfig) -> NetResult<Self> {
        let listener = TcpListener::bind(config.transport.bind_addr()?)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let pending: PendingList = Arc::new(Mutex::new(VecDeque::new()));
        let running = Arc::new(AtomicBool::new(true));
        let poll = Duration::from_millis(config.transport.accept_poll_ms);
        let accept_thread = {
            let pending = Arc::clone(&pending);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("netmsg-accept".to_owned())
                .spawn(move || run_accept(&listener, &pending, &running, poll))?
        };

        tracing::info!("Listening on {}", local_addr);
        Ok(Self {
            local_addr,
            pending,
            running,
            accept_thread: Some(accept_thread),
            last_player: PlayerId::SERVER.0,
            config: config.clone(),
        })
    }

    /// Returns the bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the number of accepted connections not yet handed out.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Hands out the oldest accepted connection, if any.
    ///
    /// Each link gets the next player id, starting at 1.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if the link's threads cannot be started,
    /// or [`NetError::PlayerIdsExhausted`] once every id below
    /// [`PlayerId::BROADCAST`] is taken. The connection is closed then.
    pub fn accept(&mut self) -> NetResult<Option<TcpLink>> {
        let Some((stream, addr)) = self.pending.lock().pop_front() else {
            return Ok(None);
        };
        let Some(player) = next_player(self.last_player) else {
            tracing::error!("No player id left for {}", addr);
            return Err(NetError::PlayerIdsExhausted);
        };
        self.last_player = player.0;
        tracing::debug!("Handing out connection from {} as {}", addr, player);
        TcpLink::from_stream(stream, player, &self.config).map(Some)
    }

    /// Stops accepting and drops every pending connection.
    pub fn close(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.accept_thread.take() {
            if handle.join().is_err() {
                tracing::error!("Accept thread panicked");
            }
        }
        self.pending.lock().clear();
    }
}

impl Drop for ListenSocket {
    fn drop(&mut self) {
        self.close();
    }
}

/// Returns the id after `last`, never the broadcast id.
fn next_player(last: u32) -> Option<PlayerId> {
    last.checked_add(1).map(PlayerId).filter(|player| !player.is_broadcast())
}

fn run_accept(
    listener: &TcpListener,
    pending: &Mutex<VecDeque<(TcpStream, SocketAddr)>>,
    running: &AtomicBool,
    poll: Duration,
) {
    while running.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, addr)) => {
                if let Err(err) = stream.set_nonblocking(false) {
                    tracing::warn!("Rejecting {}: {}", addr, err);
                    continue;
                }
                tracing::info!("Accepted connection from {}", addr);
                pending.lock().push_back((stream, addr));
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => thread::sleep(poll),
            Err(err) => {
                tracing::warn!("Accept failed: {}", err);
                thread::sleep(poll);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_next_player_stops_before_broadcast() {
        assert_eq!(next_player(PlayerId::SERVER.0), Some(PlayerId(1)));
        assert_eq!(next_player(u32::MAX - 2), Some(PlayerId(u32::MAX - 1)));
        assert_eq!(next_player(u32::MAX - 1), None);
        assert_eq!(next_player(u32::MAX), None);
    }

    #[test]
    fn test_accept_refuses_when_ids_run_out() {
        let mut config = NetConfig::default();
        config.transport.bind = "127.0.0.1:0".to_owned();
        config.transport.accept_poll_ms = 1;
        let mut listener = ListenSocket::bind(&config).unwrap();
        listener.last_player = u32::MAX - 1;

        let _client = TcpStream::connect(listener.local_addr()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while listener.pending_count() == 0 {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(1));
        }
        assert!(matches!(listener.accept(), Err(NetError::PlayerIdsExhausted)));
        assert_eq!(listener.last_player, u32::MAX - 1);
    }
}
