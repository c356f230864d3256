use thiserror::Error;

/// Errors that may occur while decoding wire values, headers or control
/// packets.
///
/// All of these are framing errors: the offending datagram (or message) is
/// discarded by the caller, the connection itself stays up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer did not contain enough bytes to decode the requested value.
    #[error("Unexpected EoF, not enough bytes to read requested type.")]
    UnexpectedEof,

    /// A string ran to the end of the buffer without a `0x00` terminator.
    #[error("String is missing its null terminator.")]
    UnterminatedString,

    /// The length stored in the header word disagrees with the datagram size.
    #[error("Header declares {declared} bytes but datagram holds {actual}.")]
    LengthMismatch { declared: usize, actual: usize },

    /// A control packet was expected but the CTL flag was not set.
    #[error("Control packet without CTL flag, header word: {0:#010x}")]
    NotControl(u32),

    /// A control command byte was not recognised by the registry.
    #[error("Unknown control command: {0:#04x}")]
    UnknownCommand(u8),

    /// The header carried none of the data/ack/unreliable flags.
    #[error("Datagram with unsupported flags: {0:#010x}")]
    UnsupportedFlags(u32),
}
