//! Coordinate and angle representations.
//!
//! Every conversion here must be bit-exact with the peer: demos and saved
//! games replay recorded messages, so a rounding difference of one unit is a
//! desync.

use crate::protocol::constants::ProtocolFlags;

/// Symmetric round-half-away-from-zero, truncated to an integer. The
/// half-step is added in `f64` so it cannot round before `floor`/`ceil`.
pub fn q_round(x: f32) -> i32 {
    let x = f64::from(x);
    if x > 0.0 {
        (x + 0.5).floor() as i32
    } else {
        (x - 0.5).ceil() as i32
    }
}

/// On-wire representation of a world coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordFormat {
    /// Raw `f32`.
    Float,
    /// `i32` fixed point at 1/16 unit.
    Int32,
    /// `i16` integer part followed by an 8-bit fraction in 1/255 steps.
    Fixed24,
    /// `i16` fixed point at 1/8 unit.
    Fixed16,
}

impl CoordFormat {
    pub fn from_flags(flags: ProtocolFlags) -> Self {
        if flags.contains(ProtocolFlags::FLOAT_COORD) {
            CoordFormat::Float
        } else if flags.contains(ProtocolFlags::INT32_COORD) {
            CoordFormat::Int32
        } else if flags.contains(ProtocolFlags::COORD_24BIT) {
            CoordFormat::Fixed24
        } else {
            CoordFormat::Fixed16
        }
    }

    /// Bytes occupied on the wire.
    pub fn wire_size(self) -> usize {
        match self {
            CoordFormat::Float | CoordFormat::Int32 => 4,
            CoordFormat::Fixed24 => 3,
            CoordFormat::Fixed16 => 2,
        }
    }

    /// Largest error a round-trip through this format may introduce.
    pub fn precision(self) -> f32 {
        match self {
            CoordFormat::Float => 0.0,
            CoordFormat::Int32 => 1.0 / 16.0,
            CoordFormat::Fixed24 => 1.0 / 255.0,
            CoordFormat::Fixed16 => 1.0 / 8.0,
        }
    }
}

/// On-wire representation of an angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleFormat {
    Float,
    /// 16 bits, 65536 steps per turn.
    Short,
    /// 8 bits, 256 steps per turn.
    Byte,
}

impl AngleFormat {
    pub fn from_flags(flags: ProtocolFlags) -> Self {
        if flags.contains(ProtocolFlags::FLOAT_ANGLE) {
            AngleFormat::Float
        } else if flags.contains(ProtocolFlags::SHORT_ANGLE) {
            AngleFormat::Short
        } else {
            AngleFormat::Byte
        }
    }

    /// Like [`AngleFormat::from_flags`] but never narrower than 16 bits.
    pub fn from_flags_16(flags: ProtocolFlags) -> Self {
        if flags.contains(ProtocolFlags::FLOAT_ANGLE) {
            AngleFormat::Float
        } else {
            AngleFormat::Short
        }
    }

    pub fn precision(self) -> f32 {
        match self {
            AngleFormat::Float => 0.0,
            AngleFormat::Short => 360.0 / 65536.0,
            AngleFormat::Byte => 360.0 / 256.0,
        }
    }
}

pub(crate) fn coord_to_int32(f: f32) -> i32 {
    q_round(f * 16.0)
}

pub(crate) fn coord_from_int32(v: i32) -> f32 {
    v as f32 * (1.0 / 16.0)
}

/// Splits a coordinate into its truncated integer part and the 1/255
/// fraction byte. Negative fractions wrap through the byte cast, so only
/// non-negative values decode back to what was written.
pub(crate) fn coord_to_fixed24(f: f32) -> (i16, u8) {
    let whole = f.trunc();
    let frac = f - whole;
    let frac_byte = q_round(frac * 255.0) % 255;
    (whole as i16, frac_byte as u8)
}

pub(crate) fn coord_from_fixed24(whole: i16, frac: u8) -> f32 {
    f32::from(whole) + f32::from(frac) * (1.0 / 255.0)
}

pub(crate) fn coord_to_fixed16(f: f32) -> i16 {
    q_round(f * 8.0) as i16
}

pub(crate) fn coord_from_fixed16(v: i16) -> f32 {
    f32::from(v) * (1.0 / 8.0)
}

pub(crate) fn angle_to_short(f: f32) -> i16 {
    (q_round(f * 65536.0 / 360.0) & 0xFFFF) as u16 as i16
}

pub(crate) fn angle_from_short(v: i16) -> f32 {
    f32::from(v) * (360.0 / 65536.0)
}

pub(crate) fn angle_to_byte(f: f32) -> u8 {
    (q_round(f * 256.0 / 360.0) & 0xFF) as u8
}

pub(crate) fn angle_from_byte(v: u8) -> f32 {
    f32::from(v as i8) * (360.0 / 256.0)
}
