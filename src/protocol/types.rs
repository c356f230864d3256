mod header;

pub use header::{DatagramHeader, HeaderWord};

use crate::protocol::packet::{DecodeError, WireEncodable};
use bytes::{Buf, BufMut};
use std::mem;

macro_rules! impl_wire_int {
    ($ty:ty, $put:ident, $get:ident) => {
        impl WireEncodable for $ty {
            fn encode_wire(&self, dst: &mut impl BufMut) {
                dst.$put(*self);
            }

            fn decode_wire(src: &mut impl Buf) -> Result<Self, DecodeError> {
                let size = mem::size_of::<$ty>();
                if src.remaining() < size {
                    return Err(DecodeError::UnexpectedEof);
                }
                Ok(src.$get())
            }
        }
    };
}

// Message payload fields are little-endian; only the transport header is
// big-endian (see `header.rs`).
impl_wire_int!(u8, put_u8, get_u8);
impl_wire_int!(i8, put_i8, get_i8);
impl_wire_int!(i16, put_i16_le, get_i16_le);
impl_wire_int!(u16, put_u16_le, get_u16_le);
impl_wire_int!(i32, put_i32_le, get_i32_le);
impl_wire_int!(u32, put_u32_le, get_u32_le);
impl_wire_int!(f32, put_f32_le, get_f32_le);

impl WireEncodable for String {
    fn encode_wire(&self, dst: &mut impl BufMut) {
        dst.put_slice(self.as_bytes());
        dst.put_u8(0);
    }

    fn decode_wire(src: &mut impl Buf) -> Result<Self, DecodeError> {
        let mut raw = Vec::new();
        loop {
            if !src.has_remaining() {
                return Err(DecodeError::UnterminatedString);
            }
            match src.get_u8() {
                0 => break,
                b => raw.push(b),
            }
        }
        // Game strings are ASCII in practice; keep whatever else arrives.
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}
