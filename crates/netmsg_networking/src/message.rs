//! # Engine Messages
//!
//! Each message type is a variant with an explicit field list and a
//! matched encode/decode pair. The payload is positional: fields appear on
//! the wire in declaration order, with no per-field tags.
//!
//! | Type | Variant     | Payload                                          |
//! |------|-------------|--------------------------------------------------|
//! | 1    | `Handshake` | version u8, player u32, in-game u8, time fixed   |
//! | 2    | `Chat`      | from u32, recipient mask u32, text string        |
//! | 3    | `Ack`       | sequence packed u16                              |
//! | 4    | `Finale`    | flags u8, script sized block                     |
//! | 5    | `Packet`    | packet bytes sized block                         |
//! | *    | `Raw`       | payload bytes as-is                              |

use netmsg_core::{CodecResult, Fixed, Reader, Writer};
use netmsg_shared::{PlayerId, MSG_ACK, MSG_CHAT, MSG_FINALE, MSG_HANDSHAKE, MSG_PACKET};

/// A message type with a matched encoder and decoder.
pub trait Message: Sized {
    /// Returns the type tag written as the first byte.
    fn message_type(&self) -> u8;

    /// Writes the payload fields.
    ///
    /// # Errors
    ///
    /// Returns the writer's error if a field does not fit.
    fn encode(&self, writer: &mut Writer<'_>) -> CodecResult<()>;

    /// Reads the payload fields of a message tagged `msg_type`.
    ///
    /// # Errors
    ///
    /// Returns the reader's error if the payload does not match the schema.
    fn decode(msg_type: u8, reader: &mut Reader<'_>) -> CodecResult<Self>;
}

/// Messages exchanged by engine peers.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineMessage {
    /// First message on a new connection.
    Handshake {
        /// Protocol version.
        version: u8,
        /// Player id assigned by the server.
        player: PlayerId,
        /// True if a map is running.
        in_game: bool,
        /// Current game time.
        game_time: Fixed,
    },
    /// A chat line.
    Chat {
        /// Sender.
        from: PlayerId,
        /// One bit per recipient.
        to_mask: u32,
        /// Text.
        text: String,
    },
    /// Acknowledges a numbered message.
    Ack {
        /// Sequence number being acknowledged.
        sequence: u16,
    },
    /// A finale script. The bytes are opaque here.
    Finale {
        /// Finale flags.
        flags: u8,
        /// Script bytes.
        script: Vec<u8>,
    },
    /// An encoded packet, see [`Protocol`](crate::Protocol).
    Packet {
        /// Packet bytes.
        block: Vec<u8>,
    },
    /// Any other type, payload passed through untouched.
    Raw {
        /// Type tag.
        msg_type: u8,
        /// Payload bytes.
        payload: Vec<u8>,
    },
}

impl Message for EngineMessage {
    fn message_type(&self) -> u8 {
        match self {
            Self::Handshake { .. } => MSG_HANDSHAKE,
            Self::Chat { .. } => MSG_CHAT,
            Self::Ack { .. } => MSG_ACK,
            Self::Finale { .. } => MSG_FINALE,
            Self::Packet { .. } => MSG_PACKET,
            Self::Raw { msg_type, .. } => *msg_type,
        }
    }

    fn encode(&self, writer: &mut Writer<'_>) -> CodecResult<()> {
        match self {
            Self::Handshake {
                version,
                player,
                in_game,
                game_time,
            } => {
                writer.write_u8(*version)?;
                writer.write_u32(player.0)?;
                writer.write_u8(u8::from(*in_game))?;
                writer.write_fixed(*game_time)
            }
            Self::Chat { from, to_mask, text } => {
                writer.write_u32(from.0)?;
                writer.write_u32(*to_mask)?;
                writer.write_string(text)
            }
            Self::Ack { sequence } => writer.write_packed_u16(*sequence),
            Self::Finale { flags, script } => {
                writer.write_u8(*flags)?;
                writer.write_sized_block(script)
            }
            Self::Packet { block } => writer.write_sized_block(block),
            Self::Raw { payload, .. } => writer.write_block(payload),
        }
    }

    fn decode(msg_type: u8, reader: &mut Reader<'_>) -> CodecResult<Self> {
        match msg_type {
            MSG_HANDSHAKE => Ok(Self::Handshake {
                version: reader.read_u8()?,
                player: PlayerId(reader.read_u32()?),
                in_game: reader.read_u8()? != 0,
                game_time: reader.read_fixed()?,
            }),
            MSG_CHAT => Ok(Self::Chat {
                from: PlayerId(reader.read_u32()?),
                to_mask: reader.read_u32()?,
                text: reader.read_string()?.to_owned(),
            }),
            MSG_ACK => Ok(Self::Ack {
                sequence: reader.read_packed_u16()?,
            }),
            MSG_FINALE => Ok(Self::Finale {
                flags: reader.read_u8()?,
                script: reader.read_sized_block()?.to_vec(),
            }),
            MSG_PACKET => Ok(Self::Packet {
                block: reader.read_sized_block()?.to_vec(),
            }),
            _ => {
                let payload = reader.remaining_data().to_vec();
                reader.skip(payload.len())?;
                Ok(Self::Raw { msg_type, payload })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netmsg_core::CodecError;

    fn roundtrip(message: &EngineMessage) -> EngineMessage {
        let mut writer = Writer::new();
        message.encode(&mut writer).unwrap();
        let mut reader = Reader::new(writer.data());
        let decoded = EngineMessage::decode(message.message_type(), &mut reader).unwrap();
        assert!(reader.at_end());
        decoded
    }

    #[test]
    fn test_handshake_layout() {
        let message = EngineMessage::Handshake {
            version: 3,
            player: PlayerId(2),
            in_game: true,
            game_time: Fixed::from_int(1),
        };
        let mut writer = Writer::new();
        message.encode(&mut writer).unwrap();
        assert_eq!(writer.data(), &[3, 2, 0, 0, 0, 1, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(roundtrip(&message), message);
    }

    #[test]
    fn test_chat_and_finale() {
        let chat = EngineMessage::Chat {
            from: PlayerId(1),
            to_mask: 0b110,
            text: "gg".to_owned(),
        };
        assert_eq!(roundtrip(&chat), chat);

        let finale = EngineMessage::Finale {
            flags: 1,
            script: b"textdef intro".to_vec(),
        };
        assert_eq!(roundtrip(&finale), finale);
    }

    #[test]
    fn test_ack_is_packed() {
        let ack = EngineMessage::Ack { sequence: 5 };
        let mut writer = Writer::new();
        ack.encode(&mut writer).unwrap();
        assert_eq!(writer.data(), &[5]);
    }

    #[test]
    fn test_unknown_type_is_raw() {
        let mut reader = Reader::new(&[9, 8, 7]);
        let decoded = EngineMessage::decode(42, &mut reader).unwrap();
        assert_eq!(
            decoded,
            EngineMessage::Raw {
                msg_type: 42,
                payload: vec![9, 8, 7]
            }
        );
        assert!(reader.at_end());
        assert_eq!(decoded.message_type(), 42);
    }

    #[test]
    fn test_truncated_chat_underruns() {
        let mut reader = Reader::new(&[1, 0, 0]);
        let err = EngineMessage::decode(MSG_CHAT, &mut reader).unwrap_err();
        assert_eq!(err, CodecError::Underrun { requested: 4, available: 3 });
    }
}
