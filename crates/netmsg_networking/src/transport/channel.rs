//! In-process transport over crossbeam channels.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use netmsg_shared::PlayerId;

use super::{Frame, Transport};
use crate::buffer::NetBuffer;
use crate::error::{NetError, NetResult};

/// One end of an in-process link.
///
/// Frames sent from one end arrive at the other tagged with the sender's
/// player id.
#[derive(Debug)]
pub struct ChannelTransport {
    local: PlayerId,
    outgoing: Sender<Frame>,
    incoming: Receiver<Frame>,
}

impl ChannelTransport {
    /// Creates two connected ends.
    ///
    /// # Arguments
    ///
    /// * `first` - Player id of the first end
    /// * `second` - Player id of the second end
    /// * `capacity` - Frames each direction can queue
    #[must_use]
    pub fn pair(first: PlayerId, second: PlayerId, capacity: usize) -> (Self, Self) {
        let (to_second, from_first) = bounded(capacity);
        let (to_first, from_second) = bounded(capacity);
        (
            Self {
                local: first,
                outgoing: to_second,
                incoming: from_second,
            },
            Self {
                local: second,
                outgoing: to_first,
                incoming: from_first,
            },
        )
    }

    /// Returns this end's player id.
    #[must_use]
    pub const fn local(&self) -> PlayerId {
        self.local
    }

    /// Returns the number of frames waiting to be received.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.incoming.len()
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, buffer: &NetBuffer) -> NetResult<()> {
        let mut frame = Frame::from_buffer(buffer);
        frame.player = self.local;
        self.outgoing.try_send(frame).map_err(|err| match err {
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

#[cfg(test)]
mod tests {
    use super::*;
    use netmsg_shared::Channel;

    #[test]
    fn test_pair_delivers_with_sender_tag() {
        let (mut a, mut b) = ChannelTransport::pair(PlayerId(1), PlayerId(2), 4);
        let mut buffer = NetBuffer::new(16);
        buffer.fill(&[6, 1]).unwrap();
        buffer.set_channel(Channel::Unreliable);
        a.send(&buffer).unwrap();
        assert_eq!(b.pending(), 1);

        let mut inbound = NetBuffer::new(16);
        assert!(b.receive(&mut inbound).unwrap());
        assert_eq!(inbound.message(), &[6, 1]);
        assert_eq!(inbound.player(), PlayerId(1));
        assert_eq!(inbound.channel(), Channel::Unreliable);
        assert!(!b.receive(&mut inbound).unwrap());
    }

    #[test]
    fn test_full_queue() {
        let (mut a, _b) = ChannelTransport::pair(PlayerId(1), PlayerId(2), 1);
        let mut buffer = NetBuffer::new(4);
        buffer.fill(&[1]).unwrap();
        a.send(&buffer).unwrap();
        assert!(matches!(a.send(&buffer), Err(NetError::QueueFull)));
    }

    #[test]
    fn test_dropped_peer_disconnects() {
        let (mut a, b) = ChannelTransport::pair(PlayerId(1), PlayerId(2), 1);
        drop(b);
        let mut buffer = NetBuffer::new(4);
        assert!(matches!(a.receive(&mut buffer), Err(NetError::Disconnected)));
        buffer.fill(&[1]).unwrap();
        assert!(matches!(a.send(&buffer), Err(NetError::Disconnected)));
    }
}
