//! Asynchronous Quake-style UDP networking on top of Tokio.
//!
//! A connection carries two kinds of traffic over one UDP socket:
//! reliable messages (fragmented, acknowledged, retransmitted, delivered in
//! order exactly once, one message in flight at a time) and unreliable
//! datagrams (delivered at most once, never older after newer).
//!
//! Connections are established through a control port handshake:
//! [`NetworkContext::connect`] on the client side and
//! [`ListenServer::accept`] on the server side.

pub mod config;
pub mod context;
pub mod protocol;
pub mod session;
pub mod transport;

pub use config::{ConnectionConfig, ListenConfig, NetConfig};
pub use context::{NetClock, NetworkContext};
pub use protocol::codec::{MessageReader, MessageWriter};
pub use protocol::constants::ProtocolFlags;
pub use transport::{Connection, ListenServer, Message};

use protocol::packet::DecodeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed packet: {0}")]
    Decode(#[from] DecodeError),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("connection broken: {0}")]
    ConnectionBroken(String),
    #[error("connection rejected: {0}")]
    Rejected(String),
    #[error("bad response from server (command {0:#04x})")]
    BadResponse(u8),
    #[error("Error in reply")]
    MalformedReply,
    #[error("timed out waiting for the server")]
    HandshakeTimeout,
    #[error("a reliable message is already in flight")]
    ReliableBusy,
    #[error("unreliable queue is full, message dropped")]
    UnreliableDropped,
    #[error("message of {0} bytes does not fit in a datagram")]
    MessageTooLarge(usize),
    #[error("could not resolve {0}")]
    AddressResolution(String),
}
