//! End-to-end message session scenarios.

use netmsg_core::CodecError;
use netmsg_networking::{
    ChannelTransport, EngineMessage, MessageSession, SessionError, SessionState, Transport,
};
use netmsg_shared::{Channel, PlayerId, SessionConfig};

fn linked_sessions() -> (MessageSession, MessageSession) {
    let config = SessionConfig::default();
    let (a, b) = ChannelTransport::pair(PlayerId(1), PlayerId(2), 64);
    (
        MessageSession::with_transport(&config, a),
        MessageSession::with_transport(&config, b),
    )
}

#[test]
fn test_int_and_float_message_layout() {
    let mut session = MessageSession::new(&SessionConfig::default());
    session.begin(5).unwrap().write_i32(-1).unwrap();
    session.writer().unwrap().write_f32(3.5).unwrap();
    session.end().unwrap();

    let buffer = session.buffer();
    assert_eq!(buffer.msg_type(), 5);
    assert_eq!(buffer.length(), 8);
    assert_eq!(
        buffer.message(),
        &[5, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x60, 0x40]
    );
}

#[test]
fn test_nested_messages_stay_separate() {
    let (mut sender, mut receiver) = linked_sessions();

    sender.begin(10).unwrap().write_u16(0xAAAA).unwrap(); // x
    sender.begin(20).unwrap().write_u16(0xBBBB).unwrap(); // y
    sender.end().unwrap();
    sender.writer().unwrap().write_u16(0xCCCC).unwrap(); // z
    sender.end().unwrap();
    assert_eq!(sender.state(), SessionState::Idle);

    assert!(receiver.receive().unwrap());
    assert_eq!(receiver.buffer().message(), &[20, 0xBB, 0xBB]);
    assert!(receiver.receive().unwrap());
    assert_eq!(receiver.buffer().message(), &[10, 0xAA, 0xAA, 0xCC, 0xCC]);
    assert!(!receiver.receive().unwrap());
}

#[test]
fn test_three_level_nesting_unwinds_in_order() {
    let mut session = MessageSession::new(&SessionConfig::default());
    session.begin(1).unwrap().write_u8(1).unwrap();
    session.begin(2).unwrap().write_u8(2).unwrap();
    session.begin(3).unwrap().write_u8(3).unwrap();
    assert_eq!(session.pending_depth(), 2);

    session.end().unwrap();
    assert_eq!(session.buffer().message(), &[3, 3]);
    session.writer().unwrap().write_u8(22).unwrap();
    session.end().unwrap();
    assert_eq!(session.buffer().message(), &[2, 2, 22]);
    session.writer().unwrap().write_u8(11).unwrap();
    session.end().unwrap();
    assert_eq!(session.buffer().message(), &[1, 1, 11]);
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_short_payload_underrun_keeps_position() {
    let mut session = MessageSession::new(&SessionConfig::default());
    session
        .deliver(PlayerId(3), Channel::Reliable, &[7, 0x01, 0x02, 0x03])
        .unwrap();

    let mut reader = session.begin_read().unwrap();
    assert_eq!(
        reader.read_i32(),
        Err(CodecError::Underrun {
            requested: 4,
            available: 3
        })
    );
    assert_eq!(reader.position(), 0);
    assert_eq!(reader.read_u8().unwrap(), 0x01);
    session.end_read();
}

#[test]
fn test_end_read_twice_is_harmless() {
    let mut session = MessageSession::new(&SessionConfig::default());
    session.deliver(PlayerId(3), Channel::Reliable, &[1, 9]).unwrap();
    let _ = session.begin_read().unwrap();
    session.end_read();
    session.end_read();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.buffer().message(), &[1, 9]);
}

#[test]
fn test_misuse_is_an_error_not_a_panic() {
    let mut session = MessageSession::new(&SessionConfig::default());
    assert!(matches!(session.end(), Err(SessionError::NotWriting { .. })));
    assert!(matches!(session.cancel(), Err(SessionError::NotWriting { .. })));
    assert!(matches!(session.writer(), Err(SessionError::NotWriting { .. })));
    session.begin(1).unwrap();
    session.end().unwrap();
}

#[test]
fn test_overflowed_write_leaves_writer_usable() {
    let config = SessionConfig {
        max_message_size: 8,
        ..SessionConfig::default()
    };
    let mut session = MessageSession::new(&config);
    let writer = session.begin(1).unwrap();
    writer.write_u32(1).unwrap();
    assert!(matches!(
        writer.write_u32(2),
        Err(CodecError::Overflow {
            requested: 4,
            available: 3
        })
    ));
    writer.write_u8(2).unwrap();
    session.end().unwrap();
    assert_eq!(session.buffer().length(), 5);
}

#[test]
fn test_typed_messages_over_channel() {
    let (mut sender, mut receiver) = linked_sessions();
    let sent = vec![
        EngineMessage::Chat {
            from: PlayerId(1),
            to_mask: 1,
            text: "hello".to_owned(),
        },
        EngineMessage::Ack { sequence: 300 },
        EngineMessage::Finale {
            flags: 0,
            script: vec![0xDE, 0xAD],
        },
    ];
    for message in &sent {
        sender.send_message(message).unwrap();
    }

    let mut received = Vec::new();
    while receiver.receive().unwrap() {
        assert_eq!(receiver.buffer().player(), PlayerId(1));
        if let Some(message) = receiver.read_message::<EngineMessage>().unwrap() {
            received.push(message);
        }
    }
    assert_eq!(received, sent);
    assert_eq!(receiver.stats().messages_received, 3);
}

#[test]
fn test_undecodable_message_is_dropped() {
    let (mut raw_end, session_end) = ChannelTransport::pair(PlayerId(1), PlayerId(2), 4);
    let mut receiver = MessageSession::with_transport(&SessionConfig::default(), session_end);

    // A chat message cut short after the sender id.
    let mut buffer = netmsg_networking::NetBuffer::new(16);
    buffer.fill(&[netmsg_shared::MSG_CHAT, 1, 0, 0, 0]).unwrap();
    raw_end.send(&buffer).unwrap();

    assert!(receiver.receive().unwrap());
    let message: Option<EngineMessage> = receiver.read_message().unwrap();
    assert!(message.is_none());
    assert_eq!(receiver.stats().messages_dropped, 1);
    assert_eq!(receiver.state(), SessionState::Idle);
}

#[test]
fn test_read_message_while_writing_decodes_the_ended_message() {
    let mut session = MessageSession::new(&SessionConfig::default());
    session
        .deliver(PlayerId(3), Channel::Reliable, &[netmsg_shared::MSG_CHAT, 1, 0, 0, 0])
        .unwrap();

    // The open Ack is ended implicitly and replaces the Chat in the buffer.
    session
        .begin(netmsg_shared::MSG_ACK)
        .unwrap()
        .write_packed_u16(7)
        .unwrap();
    assert_eq!(
        session.read_message::<EngineMessage>().unwrap(),
        Some(EngineMessage::Ack { sequence: 7 })
    );
    assert_eq!(session.buffer().message(), &[netmsg_shared::MSG_ACK, 7]);
    assert_eq!(session.stats().messages_dropped, 0);
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_read_message_on_empty_buffer_still_ends_the_write() {
    let mut session = MessageSession::new(&SessionConfig::default());
    session
        .begin(netmsg_shared::MSG_ACK)
        .unwrap()
        .write_packed_u16(300)
        .unwrap();
    assert_eq!(
        session.read_message::<EngineMessage>().unwrap(),
        Some(EngineMessage::Ack { sequence: 300 })
    );
    assert_eq!(session.stats().implicit_transitions, 1);
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_reply_while_composing() {
    let (mut sender, mut receiver) = linked_sessions();

    // An outer message is interrupted by an acknowledgement.
    sender.begin(4).unwrap().write_u8(1).unwrap();
    sender.send_message(&EngineMessage::Ack { sequence: 7 }).unwrap();
    sender.writer().unwrap().write_u8(2).unwrap();
    sender.end().unwrap();

    assert!(receiver.receive().unwrap());
    assert_eq!(
        receiver.read_message::<EngineMessage>().unwrap(),
        Some(EngineMessage::Ack { sequence: 7 })
    );
    assert!(receiver.receive().unwrap());
    assert_eq!(receiver.buffer().message(), &[4, 1, 2]);
}
