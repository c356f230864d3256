use bitflags::bitflags;
use std::time::Duration;

/// Net protocol version carried in connect and server-info requests.
pub const NET_PROTOCOL_VERSION: u8 = 3;

/// Game identity literal sent (null-terminated) in control requests.
pub const GAME_NAME: &str = "QUAKE";

/// Well-known control port the listen server binds to.
pub const DEFAULT_CONTROL_PORT: u16 = 26000;

/// Maximum payload of a single reliable fragment or unreliable datagram.
pub const MAX_DATAGRAM: usize = 32000;

/// Longest string a control packet carries per field; longer ones are cut.
/// Keeps every control packet within the 16-bit length field.
pub const MAX_CONTROL_STRING: usize = 1024;

/// Default cap on a reassembled reliable message.
pub const MAX_MESSAGE: usize = 64 * 1024;

/// Size of the `flags|length` word plus the sequence word.
pub const NET_HEADER_SIZE: usize = 8;

/// Size of the `flags|length` word alone (control packets).
pub const HEADER_WORD_SIZE: usize = 4;

/// Largest datagram we ever expect to read from a socket.
pub const MAX_RECEIVE_SIZE: usize = MAX_DATAGRAM + NET_HEADER_SIZE;

/// Mask selecting the length bits of the header word.
pub const LENGTH_MASK: u32 = 0x0000_FFFF;

/// Time after which an unacknowledged reliable fragment is sent again.
pub const RETRANSMIT_TIMEOUT: Duration = Duration::from_millis(1000);

// Control request commands.
pub const CCREQ_CONNECT: u8 = 0x01;
pub const CCREQ_SERVER_INFO: u8 = 0x02;
pub const CCREQ_PLAYER_INFO: u8 = 0x03;
pub const CCREQ_RULE_INFO: u8 = 0x04;

// Control reply commands.
pub const CCREP_ACCEPT: u8 = 0x81;
pub const CCREP_REJECT: u8 = 0x82;
pub const CCREP_SERVER_INFO: u8 = 0x83;
pub const CCREP_PLAYER_INFO: u8 = 0x84;
pub const CCREP_RULE_INFO: u8 = 0x85;

/// Reject reason sent when the client speaks another protocol version.
pub const REJECT_INCOMPATIBLE_VERSION: &str = "Incompatible version.";

/// Reject reason sent when every client slot is taken.
pub const REJECT_SERVER_FULL: &str = "Server is full.";

bitflags! {
    /// Flag bits living in the high half of the big-endian header word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct NetFlags: u32 {
        const DATA       = 0x0001_0000;
        const ACK        = 0x0002_0000;
        // Reserved, never produced.
        const NAK        = 0x0004_0000;
        const EOM        = 0x0008_0000;
        const UNRELIABLE = 0x0010_0000;
        const CTL        = 0x8000_0000;
    }
}

bitflags! {
    /// Protocol flags negotiated by the game layer; they select the on-wire
    /// representation of coordinates and angles.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[repr(transparent)]
    pub struct ProtocolFlags: u32 {
        const SHORT_ANGLE  = 1 << 1;
        const FLOAT_ANGLE  = 1 << 2;
        const COORD_24BIT  = 1 << 3;
        const FLOAT_COORD  = 1 << 4;
        const INT32_COORD  = 1 << 7;
    }
}
