use bytes::{Buf, BufMut};

use crate::protocol::{
    constants::{HEADER_WORD_SIZE, LENGTH_MASK, NET_HEADER_SIZE, NetFlags},
    packet::DecodeError,
};

/// First header word: flags in the high half, total packet length in the
/// low half, big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderWord {
    pub flags: NetFlags,
    pub length: u16,
}

impl HeaderWord {
    pub fn new(flags: NetFlags, length: usize) -> Self {
        debug_assert!(length <= LENGTH_MASK as usize, "length {length} overflows header");
        Self {
            flags,
            length: (length as u32 & LENGTH_MASK) as u16,
        }
    }

    pub fn to_bits(self) -> u32 {
        self.flags.bits() | u32::from(self.length)
    }

    pub fn from_bits(word: u32) -> Self {
        Self {
            flags: NetFlags::from_bits_truncate(word & !LENGTH_MASK),
            length: (word & LENGTH_MASK) as u16,
        }
    }

    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32(self.to_bits());
    }

    pub fn decode(src: &mut impl Buf) -> Result<Self, DecodeError> {
        if src.remaining() < HEADER_WORD_SIZE {
            return Err(DecodeError::UnexpectedEof);
        }
        Ok(Self::from_bits(src.get_u32()))
    }

    /// Checks the declared length against the number of bytes actually
    /// received for this datagram.
    pub fn validate_len(&self, actual: usize) -> Result<(), DecodeError> {
        if usize::from(self.length) != actual {
            return Err(DecodeError::LengthMismatch {
                declared: usize::from(self.length),
                actual,
            });
        }
        Ok(())
    }
}

/// Full 8-byte header used by data, ack and unreliable datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatagramHeader {
    pub flags: NetFlags,
    pub length: u16,
    pub sequence: u32,
}

impl DatagramHeader {
    pub fn new(flags: NetFlags, payload_len: usize, sequence: u32) -> Self {
        let word = HeaderWord::new(flags, NET_HEADER_SIZE + payload_len);
        Self {
            flags,
            length: word.length,
            sequence,
        }
    }

    pub fn encode(&self, dst: &mut impl BufMut) {
        HeaderWord {
            flags: self.flags,
            length: self.length,
        }
        .encode(dst);
        dst.put_u32(self.sequence);
    }

    pub fn decode(src: &mut impl Buf) -> Result<Self, DecodeError> {
        if src.remaining() < NET_HEADER_SIZE {
            return Err(DecodeError::UnexpectedEof);
        }
        let word = HeaderWord::decode(src)?;
        let sequence = src.get_u32();
        Ok(DatagramHeader {
            flags: word.flags,
            length: word.length,
            sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn ack_header_is_eight_bytes_with_ack_flag() {
        let mut buf = BytesMut::new();
        DatagramHeader::new(NetFlags::ACK, 0, 0).encode(&mut buf);
        assert_eq!(&buf[..], &[0, 2, 0, 8, 0, 0, 0, 0]);
    }

    #[test]
    fn control_word_keeps_top_bit() {
        let word = HeaderWord::new(NetFlags::CTL, 12);
        assert_eq!(word.to_bits(), 0x8000_000C);
        assert_eq!(HeaderWord::from_bits(0x8000_000C), word);
    }

    #[test]
    fn length_mismatch_is_reported() {
        let word = HeaderWord::new(NetFlags::UNRELIABLE, 12);
        assert_eq!(
            word.validate_len(11),
            Err(DecodeError::LengthMismatch {
                declared: 12,
                actual: 11
            })
        );
        assert!(word.validate_len(12).is_ok());
    }

    #[test]
    fn short_header_is_eof() {
        let mut src: &[u8] = &[0, 1, 0, 8, 0, 0];
        assert_eq!(DatagramHeader::decode(&mut src), Err(DecodeError::UnexpectedEof));
    }
}
