//! Message reader/writer for game payloads.
//!
//! [`MessageWriter`] assembles an outbound message, [`MessageReader`] walks an
//! inbound one. Every multi-byte field is little-endian. Coordinates and
//! angles pick their representation from the negotiated [`ProtocolFlags`].

pub mod coord;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::protocol::{
    constants::ProtocolFlags,
    packet::{DecodeError, WireEncodable},
};
use coord::{AngleFormat, CoordFormat};

/// Append-only message buffer.
#[derive(Debug, Default, Clone)]
pub struct MessageWriter {
    buf: BytesMut,
}

impl MessageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Hands the assembled message over, leaving the writer empty.
    pub fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn write<T: WireEncodable>(&mut self, value: &T) {
        value.encode_wire(&mut self.buf);
    }

    pub fn write_byte(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn write_char(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    pub fn write_short(&mut self, v: i16) {
        v.encode_wire(&mut self.buf);
    }

    pub fn write_long(&mut self, v: i32) {
        v.encode_wire(&mut self.buf);
    }

    pub fn write_float(&mut self, v: f32) {
        v.encode_wire(&mut self.buf);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    pub fn write_string(&mut self, s: &str) {
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
    }

    pub fn write_coord(&mut self, f: f32, flags: ProtocolFlags) {
        match CoordFormat::from_flags(flags) {
            CoordFormat::Float => self.write_float(f),
            CoordFormat::Int32 => self.write_long(coord::coord_to_int32(f)),
            CoordFormat::Fixed24 => {
                let (whole, frac) = coord::coord_to_fixed24(f);
                self.write_short(whole);
                self.write_byte(frac);
            }
            CoordFormat::Fixed16 => self.write_short(coord::coord_to_fixed16(f)),
        }
    }

    pub fn write_angle(&mut self, f: f32, flags: ProtocolFlags) {
        self.write_angle_as(f, AngleFormat::from_flags(flags));
    }

    pub fn write_angle16(&mut self, f: f32, flags: ProtocolFlags) {
        self.write_angle_as(f, AngleFormat::from_flags_16(flags));
    }

    fn write_angle_as(&mut self, f: f32, format: AngleFormat) {
        match format {
            AngleFormat::Float => self.write_float(f),
            AngleFormat::Short => self.write_short(coord::angle_to_short(f)),
            AngleFormat::Byte => self.write_byte(coord::angle_to_byte(f)),
        }
    }
}

/// Read cursor over a received message.
#[derive(Debug, Clone)]
pub struct MessageReader {
    buf: Bytes,
}

impl MessageReader {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self { buf: buf.into() }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    /// Everything not yet consumed.
    pub fn rest(&self) -> &[u8] {
        &self.buf
    }

    pub fn read<T: WireEncodable>(&mut self) -> Result<T, DecodeError> {
        T::decode_wire(&mut self.buf)
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        self.read()
    }

    pub fn read_char(&mut self) -> Result<i8, DecodeError> {
        self.read()
    }

    pub fn read_short(&mut self) -> Result<i16, DecodeError> {
        self.read()
    }

    pub fn read_long(&mut self) -> Result<i32, DecodeError> {
        self.read()
    }

    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        self.read()
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        self.read()
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes, DecodeError> {
        if self.buf.remaining() < len {
            return Err(DecodeError::UnexpectedEof);
        }
        Ok(self.buf.split_to(len))
    }

    pub fn read_coord(&mut self, flags: ProtocolFlags) -> Result<f32, DecodeError> {
        Ok(match CoordFormat::from_flags(flags) {
            CoordFormat::Float => self.read_float()?,
            CoordFormat::Int32 => coord::coord_from_int32(self.read_long()?),
            CoordFormat::Fixed24 => {
                if self.remaining() < 3 {
                    return Err(DecodeError::UnexpectedEof);
                }
                let whole = self.read_short()?;
                let frac = self.read_byte()?;
                coord::coord_from_fixed24(whole, frac)
            }
            CoordFormat::Fixed16 => coord::coord_from_fixed16(self.read_short()?),
        })
    }

    pub fn read_angle(&mut self, flags: ProtocolFlags) -> Result<f32, DecodeError> {
        self.read_angle_as(AngleFormat::from_flags(flags))
    }

    pub fn read_angle16(&mut self, flags: ProtocolFlags) -> Result<f32, DecodeError> {
        self.read_angle_as(AngleFormat::from_flags_16(flags))
    }

    fn read_angle_as(&mut self, format: AngleFormat) -> Result<f32, DecodeError> {
        Ok(match format {
            AngleFormat::Float => self.read_float()?,
            AngleFormat::Short => coord::angle_from_short(self.read_short()?),
            AngleFormat::Byte => coord::angle_from_byte(self.read_byte()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COORD_MODES: [ProtocolFlags; 4] = [
        ProtocolFlags::FLOAT_COORD,
        ProtocolFlags::INT32_COORD,
        ProtocolFlags::COORD_24BIT,
        ProtocolFlags::empty(),
    ];

    const ANGLE_MODES: [ProtocolFlags; 3] = [
        ProtocolFlags::FLOAT_ANGLE,
        ProtocolFlags::SHORT_ANGLE,
        ProtocolFlags::empty(),
    ];

    fn coord_roundtrip(f: f32, flags: ProtocolFlags) -> f32 {
        let mut w = MessageWriter::new();
        w.write_coord(f, flags);
        assert_eq!(w.len(), CoordFormat::from_flags(flags).wire_size());
        let mut r = MessageReader::new(w.freeze());
        let out = r.read_coord(flags).unwrap();
        assert!(r.is_empty());
        out
    }

    fn angle_distance(a: f32, b: f32) -> f32 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    #[test]
    fn coords_roundtrip_within_precision() {
        // The 24-bit form only carries non-negative fractions faithfully.
        let signed = [0.0_f32, 1.0, -1.0, 12.375, -12.375, 1024.5, -4095.875, 3.1];
        let unsigned = [0.0_f32, 1.0, 12.375, 1024.5, 3.1, 100.25, 4000.6];

        for flags in COORD_MODES {
            let format = CoordFormat::from_flags(flags);
            let values: &[f32] = if format == CoordFormat::Fixed24 {
                &unsigned
            } else {
                &signed
            };
            for &f in values {
                let out = coord_roundtrip(f, flags);
                assert!(
                    (out - f).abs() <= format.precision(),
                    "{f} came back as {out} in {format:?}"
                );
            }
        }
    }

    #[test]
    fn float_coord_is_exact() {
        for f in [f32::MIN_POSITIVE, 123456.78, -0.001] {
            assert_eq!(coord_roundtrip(f, ProtocolFlags::FLOAT_COORD), f);
        }
    }

    #[test]
    fn int32_coord_bytes_for_odd_sixteenths() {
        let mut w = MessageWriter::new();
        w.write_coord(524288.0625, ProtocolFlags::INT32_COORD);
        assert_eq!(w.as_bytes(), &[1, 0, 128, 0]);
    }

    #[test]
    fn angles_roundtrip_modulo_a_turn() {
        for flags in ANGLE_MODES {
            let format = AngleFormat::from_flags(flags);
            for f in [0.0_f32, 45.0, 90.0, 179.0, 180.0, 270.0, 359.0, -90.0, 720.5] {
                let mut w = MessageWriter::new();
                w.write_angle(f, flags);
                let mut r = MessageReader::new(w.freeze());
                let out = r.read_angle(flags).unwrap();
                assert!(
                    angle_distance(out, f) <= format.precision(),
                    "{f} came back as {out} in {format:?}"
                );
            }
        }
    }

    #[test]
    fn angle16_never_uses_a_single_byte() {
        let mut w = MessageWriter::new();
        w.write_angle16(90.0, ProtocolFlags::empty());
        assert_eq!(w.as_bytes(), &[0x00, 0x40]);

        let mut r = MessageReader::new(w.freeze());
        assert_eq!(r.read_angle16(ProtocolFlags::empty()).unwrap(), 90.0);
    }

    #[test]
    fn mixed_message_reads_back_in_order() {
        let mut w = MessageWriter::new();
        w.write_byte(7);
        w.write_short(-2);
        w.write_long(0x0102_0304);
        w.write_float(1.5);
        w.write_string("maps/e1m1.bsp");
        w.write_string("");

        let mut r = MessageReader::new(w.freeze());
        assert_eq!(r.read_byte().unwrap(), 7);
        assert_eq!(r.read_short().unwrap(), -2);
        assert_eq!(r.read_long().unwrap(), 0x0102_0304);
        assert_eq!(r.read_float().unwrap(), 1.5);
        assert_eq!(r.read_string().unwrap(), "maps/e1m1.bsp");
        assert_eq!(r.read_string().unwrap(), "");
        assert_eq!(r.read_byte(), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn truncated_coord_is_an_error() {
        let mut r = MessageReader::new(vec![0x01, 0x02]);
        assert_eq!(
            r.read_coord(ProtocolFlags::COORD_24BIT),
            Err(DecodeError::UnexpectedEof)
        );
        // Nothing consumed by the failed read.
        assert_eq!(r.remaining(), 2);
    }
}
