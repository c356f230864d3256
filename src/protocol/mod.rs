//! Wire protocol primitives, control packets and the message codec.
//!
//! This module houses constants, header and packet definitions, and the
//! little-endian message reader/writer used by the higher-level session and
//! transport layers. Nothing in here performs I/O.

pub mod codec;
pub mod constants;
pub mod packet;
pub mod types;
