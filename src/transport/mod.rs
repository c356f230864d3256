//! Tokio-based UDP transport.
//!
//! - [`Connection`] owns one connected socket plus a read task and a write
//!   task driving the session state machines.
//! - [`ListenServer`] answers the control port and hands out accepted
//!   connections.
//! - `client` performs the connect handshake and server queries.

use bytes::Bytes;

pub mod client;
pub mod connection;
pub mod datagram;
pub mod listener;
pub mod stats;

pub use connection::Connection;
pub use listener::{ListenServer, PlayerStatus, ServerStatus};
pub use stats::{NetStats, StatsSnapshot};

/// A message received from a connection, tagged with the channel it came in on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Reliable(Bytes),
    Unreliable(Bytes),
}

impl Message {
    pub fn payload(&self) -> &Bytes {
        match self {
            Message::Reliable(payload) | Message::Unreliable(payload) => payload,
        }
    }

    pub fn into_payload(self) -> Bytes {
        match self {
            Message::Reliable(payload) | Message::Unreliable(payload) => payload,
        }
    }

    pub fn is_reliable(&self) -> bool {
        matches!(self, Message::Reliable(_))
    }
}
