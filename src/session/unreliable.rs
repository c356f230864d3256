use bytes::Bytes;

use crate::{protocol::constants::NetFlags, transport::datagram::Datagram};

/// Send half of the unreliable channel.
#[derive(Debug, Default)]
pub struct UnreliableSender {
    send_sequence: u32,
}

impl UnreliableSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_sequence(&self) -> u32 {
        self.send_sequence
    }

    /// Frames `payload` with the next sequence number.
    pub fn frame(&mut self, payload: Bytes) -> Datagram {
        let datagram = Datagram::new(NetFlags::UNRELIABLE, self.send_sequence, payload);
        self.send_sequence = self.send_sequence.wrapping_add(1);
        datagram
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreliableOutcome {
    /// Deliver the payload; `skipped` datagrams were lost in between.
    Deliver { skipped: u32 },
    /// Older than something already delivered; drop it.
    Stale { expected: u32 },
}

/// Receive half of the unreliable channel.
#[derive(Debug, Default)]
pub struct UnreliableReceiver {
    receive_sequence: u32,
}

impl UnreliableReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Smallest sequence number that will still be accepted.
    pub fn receive_sequence(&self) -> u32 {
        self.receive_sequence
    }

    pub fn on_datagram(&mut self, sequence: u32) -> UnreliableOutcome {
        if sequence < self.receive_sequence {
            return UnreliableOutcome::Stale {
                expected: self.receive_sequence,
            };
        }
        let skipped = sequence - self.receive_sequence;
        self.receive_sequence = sequence.wrapping_add(1);
        UnreliableOutcome::Deliver { skipped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_numbers_every_datagram() {
        let mut tx = UnreliableSender::new();
        assert_eq!(tx.frame(Bytes::from_static(b"a")).header.sequence, 0);
        assert_eq!(tx.frame(Bytes::from_static(b"b")).header.sequence, 1);
        assert_eq!(tx.send_sequence(), 2);
    }

    #[test]
    fn gaps_are_delivered_and_counted() {
        let mut rx = UnreliableReceiver::new();
        assert_eq!(rx.on_datagram(0), UnreliableOutcome::Deliver { skipped: 0 });
        assert_eq!(rx.on_datagram(3), UnreliableOutcome::Deliver { skipped: 2 });
        assert_eq!(rx.on_datagram(2), UnreliableOutcome::Stale { expected: 4 });
        assert_eq!(rx.receive_sequence(), 4);
    }
}
