pub mod control;
mod error;
mod registry;

pub use control::*;
pub use error::DecodeError;
pub use registry::ControlPacket;

use bytes::{Buf, BufMut};

use crate::protocol::codec::{MessageReader, MessageWriter};

/// Trait implemented by all control packet body types.
///
/// Implementations are responsible for encoding/decoding only the packet
/// body; the header word and command byte are handled by `ControlPacket`.
pub trait Packet: Sized {
    /// The command byte used to identify this packet on the wire.
    const ID: u8;

    /// Encode the body of this packet into the message writer.
    fn encode_body(&self, dst: &mut MessageWriter);

    /// Decode the body of this packet from the message reader.
    fn decode_body(src: &mut MessageReader) -> Result<Self, DecodeError>;
}

/// Trait for fixed-format values that know how to encode/decode themselves
/// in message payloads.
pub trait WireEncodable: Sized {
    /// Encode this value into the destination buffer.
    fn encode_wire(&self, dst: &mut impl BufMut);

    /// Decode a value of this type from the source buffer.
    fn decode_wire(src: &mut impl Buf) -> Result<Self, DecodeError>;
}
