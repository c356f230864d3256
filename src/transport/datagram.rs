use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::protocol::{
    constants::{NET_HEADER_SIZE, NetFlags},
    packet::DecodeError,
    types::DatagramHeader,
};

/// One data, ack or unreliable datagram as it travels on a session socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub header: DatagramHeader,
    pub payload: Bytes,
}

impl Datagram {
    pub fn new(flags: NetFlags, sequence: u32, payload: Bytes) -> Self {
        Self {
            header: DatagramHeader::new(flags, payload.len(), sequence),
            payload,
        }
    }

    /// Header-only acknowledgment echoing `sequence`.
    pub fn ack(sequence: u32) -> Self {
        Self::new(NetFlags::ACK, sequence, Bytes::new())
    }

    pub fn wire_len(&self) -> usize {
        NET_HEADER_SIZE + self.payload.len()
    }

    pub fn encode(&self, dst: &mut impl BufMut) {
        self.header.encode(dst);
        dst.put_slice(&self.payload);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Parses a whole received datagram. The declared length must match the
    /// number of bytes that arrived.
    pub fn decode(mut src: Bytes) -> Result<Self, DecodeError> {
        let actual = src.len();
        let header = DatagramHeader::decode(&mut src)?;
        if usize::from(header.length) != actual {
            return Err(DecodeError::LengthMismatch {
                declared: usize::from(header.length),
                actual,
            });
        }
        let payload = src.copy_to_bytes(src.remaining());
        Ok(Self { header, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreliable_datagram_layout() {
        let dgram = Datagram::new(NetFlags::UNRELIABLE, 42, Bytes::from_static(&[1, 2, 45, 5]));
        assert_eq!(
            &dgram.to_bytes()[..],
            &[0x00, 0x10, 0x00, 0x0C, 0, 0, 0, 42, 1, 2, 45, 5]
        );
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let raw = Bytes::from_static(&[0x00, 0x10, 0x00, 0x0B, 0, 0, 0, 44, 1, 2, 45, 5]);
        assert!(matches!(
            Datagram::decode(raw),
            Err(DecodeError::LengthMismatch {
                declared: 11,
                actual: 12
            })
        ));
    }

    #[test]
    fn decode_splits_header_and_payload() {
        let raw = Bytes::from_static(&[0x00, 0x09, 0x00, 0x0B, 0, 0, 0, 1, 83, 212, 43]);
        let dgram = Datagram::decode(raw).unwrap();
        assert_eq!(dgram.header.flags, NetFlags::DATA | NetFlags::EOM);
        assert_eq!(dgram.header.sequence, 1);
        assert_eq!(&dgram.payload[..], &[83, 212, 43]);
    }
}
