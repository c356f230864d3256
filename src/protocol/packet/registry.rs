use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::{
    codec::{MessageReader, MessageWriter},
    constants::{HEADER_WORD_SIZE, NetFlags},
    packet::{DecodeError, Packet, control::*},
    types::HeaderWord,
};

/// INTERNAL
/// Used to generate the ControlPacket enum type
/// used by the handshake client and the listen server
/// to encode and decode control datagrams.
macro_rules! define_control_packets {
    (
        $(
            $name:ident,
        )+
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum ControlPacket {
            $(
                $name($name),
            )+
        }

        impl ControlPacket {
            /// Decodes a whole control datagram: header word, command byte
            /// and body. The declared length must match `datagram.len()`.
            pub fn decode(datagram: &[u8]) -> Result<Self, DecodeError> {
                let mut src = datagram;
                let word = HeaderWord::decode(&mut src)?;
                if word.flags != NetFlags::CTL {
                    return Err(DecodeError::NotControl(word.to_bits()));
                }
                word.validate_len(datagram.len())?;

                let mut reader = MessageReader::new(Bytes::copy_from_slice(src));
                let id = reader.read_byte()?;
                Ok(match id {
                    $(
                        <$name as Packet>::ID => {
                            ControlPacket::$name(<$name as Packet>::decode_body(&mut reader)?)
                        }
                    )+
                    other => return Err(DecodeError::UnknownCommand(other)),
                })
            }

            pub fn id(&self) -> u8 {
                match self {
                    $(
                        ControlPacket::$name(_inner) => <$name as Packet>::ID,
                    )+
                }
            }

            pub fn encode(&self) -> Bytes {
                let mut body = MessageWriter::new();
                body.write_byte(self.id());
                match self {
                    $(
                        ControlPacket::$name(inner) => inner.encode_body(&mut body),
                    )+
                }

                let total = HEADER_WORD_SIZE + body.len();
                let mut out = BytesMut::with_capacity(total);
                HeaderWord::new(NetFlags::CTL, total).encode(&mut out);
                out.put_slice(body.as_bytes());
                out.freeze()
            }
        }

        $(
            impl From<$name> for ControlPacket {
                fn from(value: $name) -> Self {
                    ControlPacket::$name(value)
                }
            }
        )+
    }
}

define_control_packets! {
    ConnectRequest,
    ServerInfoRequest,
    PlayerInfoRequest,
    RuleInfoRequest,
    Accept,
    Reject,
    ServerInfoReply,
    PlayerInfoReply,
    RuleInfoReply,
}
