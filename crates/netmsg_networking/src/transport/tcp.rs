//! # TCP Link
//!
//! A framed, ordered message link over one TCP stream.
//!
//! Each link runs two threads:
//!
//! ```text
//!   send()  ──► outgoing queue ──► sender thread ──► socket
//!   socket  ──► receiver thread ──► incoming queue ──► receive()
//! ```
//!
//! The session side never blocks on the socket. A full outgoing queue is
//! reported as [`NetError::QueueFull`].

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use netmsg_core::{ByteQueue, Writer};
use netmsg_shared::{NetConfig, PlayerId};

use super::{Frame, Transport};
use crate::buffer::NetBuffer;
use crate::error::{NetError, NetResult};

/// How long `close` waits for queued frames to reach the socket.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Link statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Frames written to the socket.
    pub frames_sent: u64,
    /// Frames read from the socket.
    pub frames_received: u64,
    /// Bytes written, frame headers included.
    pub bytes_sent: u64,
    /// Bytes read, frame headers included.
    pub bytes_received: u64,
}

#[derive(Default)]
struct SharedStats {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
}

/// Per-link state shared with the worker threads.
struct LinkShared {
    connected: AtomicBool,
    stats: SharedStats,
}

/// A message link over TCP.
pub struct TcpLink {
    peer: PlayerId,
    addr: SocketAddr,
    stream: TcpStream,
    outgoing: Option<Sender<Frame>>,
    incoming: Receiver<Frame>,
    shared: Arc<LinkShared>,
    sender: Option<JoinHandle<()>>,
    receiver: Option<JoinHandle<()>>,
}

impl TcpLink {
    /// Connects to a listening peer.
    ///
    /// # Arguments
    ///
    /// * `addr` - Peer address
    /// * `peer` - Player id inbound messages are tagged with
    /// * `config` - Queue sizes and message limit
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if the connection fails.
    pub fn connect(addr: SocketAddr, peer: PlayerId, config: &NetConfig) -> NetResult<Self> {
        let stream = TcpStream::connect(addr)?;
        Self::from_stream(stream, peer, config)
    }

    /// Wraps an established stream and starts the worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if the stream cannot be configured or
    /// cloned, or a worker thread cannot be spawned.
    pub fn from_stream(stream: TcpStream, peer: PlayerId, config: &NetConfig) -> NetResult<Self> {
        stream.set_nodelay(true)?;
        let addr = stream.peer_addr()?;
        let capacity = config.transport.channel_capacity;
        let (out_tx, out_rx) = bounded(capacity);
        let (in_tx, in_rx) = bounded(capacity);
        let shared = Arc::new(LinkShared {
            connected: AtomicBool::new(true),
            stats: SharedStats::default(),
        });

        let sender = {
            let stream = stream.try_clone()?;
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(format!("netmsg-send-{}", peer.0))
                .spawn(move || run_sender(stream, &out_rx, &shared))?
        };
        let receiver = {
            let stream = stream.try_clone()?;
            let shared = Arc::clone(&shared);
            let max_message = config.session.max_message_size;
            let chunk = config.transport.read_chunk_size;
            thread::Builder::new()
                .name(format!("netmsg-recv-{}", peer.0))
                .spawn(move || run_receiver(stream, &in_tx, peer, max_message, chunk, &shared))?
        };

        tracing::info!("Link to {} established ({})", addr, peer);
        Ok(Self {
            peer,
            addr,
            stream,
            outgoing: Some(out_tx),
            incoming: in_rx,
            shared,
            sender: Some(sender),
            receiver: Some(receiver),
        })
    }

    /// Returns the player id inbound messages are tagged with.
    #[must_use]
    pub const fn peer(&self) -> PlayerId {
        self.peer
    }

    /// Returns the remote address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns true while both directions are open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Returns a snapshot of the link counters.
    #[must_use]
    pub fn stats(&self) -> LinkStats {
        let stats = &self.shared.stats;
        LinkStats {
            frames_sent: stats.frames_sent.load(Ordering::Relaxed),
            frames_received: stats.frames_received.load(Ordering::Relaxed),
            bytes_sent: stats.bytes_sent.load(Ordering::Relaxed),
            bytes_received: stats.bytes_received.load(Ordering::Relaxed),
        }
    }

    /// Closes the socket and joins the worker threads.
    ///
    /// Frames still queued for sending are flushed first, for at most one
    /// second. Whatever a stalled peer has not taken by then is dropped.
    pub fn close(&mut self) {
        // Dropping the sender lets the send thread drain and exit.
        self.outgoing = None;
        let flushed = self
            .sender
            .as_ref()
            .map_or(true, |handle| wait_finished(handle, FLUSH_TIMEOUT));
        if !flushed {
            tracing::warn!("{} is not reading, dropping unsent frames", self.peer);
        }
        self.shared.connected.store(false, Ordering::Release);
        // Unblocks a send thread stuck in a write.
        let _ = self.stream.shutdown(Shutdown::Both);
        if let Some(handle) = self.sender.take() {
            if handle.join().is_err() {
                tracing::error!("Send thread for {} panicked", self.peer);
            }
        }
        // The receive thread may be blocked handing over a frame.
        self.incoming = crossbeam_channel::never();
        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                tracing::error!("Receive thread for {} panicked", self.peer);
            }
        }
    }
}

impl Transport for TcpLink {
    fn send(&mut self, buffer: &NetBuffer) -> NetResult<()> {
        if !self.is_connected() {
            return Err(NetError::Disconnected);
        }
        let outgoing = self.outgoing.as_ref().ok_or(NetError::Disconnected)?;
        outgoing
            .try_send(Frame::from_buffer(buffer))
            .map_err(|err| match err {
                TrySendError::Full(_) => NetError::QueueFull,
                TrySendError::Disconnected(_) => NetError::Disconnected,
            })
    }

    fn receive(&mut self, buffer: &mut NetBuffer) -> NetResult<bool> {
        match self.incoming.try_recv() {
            Ok(frame) => {
                frame.load_into(buffer)?;
                Ok(true)
            }
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(NetError::Disconnected),
        }
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TcpLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpLink")
            .field("peer", &self.peer)
            .field("addr", &self.addr)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Waits up to `timeout` for `handle` to finish. Returns true if it did.
fn wait_finished(handle: &JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
    true
}

fn run_sender(mut stream: TcpStream, outgoing: &Receiver<Frame>, shared: &LinkShared) {
    let mut out = Writer::new();
    for frame in outgoing {
        out.reset();
        if let Err(err) = frame.encode(&mut out) {
            tracing::warn!("Dropping unsendable frame: {}", err);
            continue;
        }
        if let Err(err) = stream.write_all(out.data()) {
            tracing::debug!("Socket write failed: {}", err);
            shared.connected.store(false, Ordering::Release);
            return;
        }
        shared.stats.frames_sent.fetch_add(1, Ordering::Relaxed);
        shared
            .stats
            .bytes_sent
            .fetch_add(out.size() as u64, Ordering::Relaxed);
    }
    let _ = stream.flush();
}

fn run_receiver(
    mut stream: TcpStream,
    incoming: &Sender<Frame>,
    peer: PlayerId,
    max_message: usize,
    chunk_size: usize,
    shared: &LinkShared,
) {
    let mut pending = ByteQueue::with_capacity(chunk_size);
    let mut chunk = vec![0u8; chunk_size];
    'read: loop {
        let count = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(count) => count,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::debug!("Socket read failed: {}", err);
                break;
            }
        };
        shared
            .stats
            .bytes_received
            .fetch_add(count as u64, Ordering::Relaxed);
        pending.push(&chunk[..count]);

        loop {
            match Frame::decode_from(&mut pending, peer, max_message) {
                Ok(Some(frame)) => {
                    shared.stats.frames_received.fetch_add(1, Ordering::Relaxed);
                    if incoming.send(frame).is_err() {
                        break 'read;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!("Malformed stream from {}: {}", peer, err);
                    break 'read;
                }
            }
        }
    }
    shared.connected.store(false, Ordering::Release);
    tracing::info!("Link to {} closed", peer);
}
