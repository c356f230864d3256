use bytes::Bytes;

use crate::{
    protocol::{constants::NetFlags, packet::DecodeError},
    session::{
        reliable::{DataOutcome, ReliableReceiver},
        unreliable::{UnreliableOutcome, UnreliableReceiver},
    },
    transport::datagram::Datagram,
};

/// Result of feeding one datagram into the receive direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A reliable fragment. `ack` must be written back to the peer whatever
    /// the outcome.
    Data { ack: Datagram, outcome: DataOutcome },
    /// The fragment would complete a message but there is nowhere to put it.
    /// Not acknowledged, so the peer sends it again.
    Deferred { sequence: u32 },
    /// Acknowledgment for our own reliable send side.
    Ack { sequence: u32 },
    Unreliable { payload: Bytes, skipped: u32 },
    Stale { sequence: u32, expected: u32 },
}

/// Receive-direction state of one connection. Owned by the read task.
#[derive(Debug, Default)]
pub struct InboundSession {
    reliable: ReliableReceiver,
    unreliable: UnreliableReceiver,
}

impl InboundSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session whose reliable messages may grow to at most `max_message`
    /// bytes.
    pub fn with_max_message(max_message: usize) -> Self {
        Self {
            reliable: ReliableReceiver::with_max_message(max_message),
            unreliable: UnreliableReceiver::new(),
        }
    }

    pub fn reliable(&self) -> &ReliableReceiver {
        &self.reliable
    }

    pub fn unreliable(&self) -> &UnreliableReceiver {
        &self.unreliable
    }

    /// Decodes and handles one raw datagram.
    pub fn handle_bytes(&mut self, raw: Bytes, has_room: bool) -> Result<Inbound, DecodeError> {
        let datagram = Datagram::decode(raw)?;
        self.handle_datagram(datagram, has_room)
    }

    /// Demultiplexes by flag bits. `has_room` tells whether a completed
    /// reliable message can be handed to the caller right now.
    pub fn handle_datagram(
        &mut self,
        datagram: Datagram,
        has_room: bool,
    ) -> Result<Inbound, DecodeError> {
        let header = datagram.header;
        let flags = header.flags;
        let sequence = header.sequence;

        if flags.contains(NetFlags::CTL) {
            return Err(DecodeError::UnsupportedFlags(flags.bits()));
        }

        if flags.contains(NetFlags::UNRELIABLE) {
            return Ok(match self.unreliable.on_datagram(sequence) {
                UnreliableOutcome::Deliver { skipped } => Inbound::Unreliable {
                    payload: datagram.payload,
                    skipped,
                },
                UnreliableOutcome::Stale { expected } => Inbound::Stale { sequence, expected },
            });
        }

        if flags.contains(NetFlags::ACK) {
            return Ok(Inbound::Ack { sequence });
        }

        if flags.contains(NetFlags::DATA) {
            let eom = flags.contains(NetFlags::EOM);
            if eom && !has_room && self.reliable.expects(sequence) {
                return Ok(Inbound::Deferred { sequence });
            }
            let outcome = self.reliable.on_data(sequence, eom, &datagram.payload);
            return Ok(Inbound::Data {
                ack: Datagram::ack(sequence),
                outcome,
            });
        }

        Err(DecodeError::UnsupportedFlags(flags.bits()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(bytes: &'static [u8]) -> Bytes {
        Bytes::from_static(bytes)
    }

    #[test]
    fn unreliable_stale_sequences_are_dropped() {
        let mut session = InboundSession::new();

        // len=12|UNRELIABLE, seq 42
        let first = session
            .handle_bytes(raw(&[0, 16, 0, 12, 0, 0, 0, 42, 1, 2, 45, 5]), true)
            .unwrap();
        assert_eq!(
            first,
            Inbound::Unreliable {
                payload: raw(&[1, 2, 45, 5]),
                skipped: 42
            }
        );
        assert_eq!(session.unreliable().receive_sequence(), 43);

        let duplicate = session
            .handle_bytes(raw(&[0, 16, 0, 12, 0, 0, 0, 42, 1, 2, 45, 5]), true)
            .unwrap();
        assert_eq!(
            duplicate,
            Inbound::Stale {
                sequence: 42,
                expected: 43
            }
        );

        let fresh = session
            .handle_bytes(raw(&[0, 16, 0, 12, 0, 0, 0, 44, 1, 2, 45, 5]), true)
            .unwrap();
        assert_eq!(
            fresh,
            Inbound::Unreliable {
                payload: raw(&[1, 2, 45, 5]),
                skipped: 1
            }
        );

        // len=11|UNRELIABLE seq 44 is now stale, seq 45 goes through.
        let stale = session
            .handle_bytes(raw(&[0, 16, 0, 11, 0, 0, 0, 44, 2, 45, 5]), true)
            .unwrap();
        assert!(matches!(stale, Inbound::Stale { sequence: 44, .. }));
        let next = session
            .handle_bytes(raw(&[0, 16, 0, 11, 0, 0, 0, 45, 83, 212, 43]), true)
            .unwrap();
        assert_eq!(
            next,
            Inbound::Unreliable {
                payload: raw(&[83, 212, 43]),
                skipped: 0
            }
        );
    }

    #[test]
    fn reliable_single_packet_is_acked_and_delivered_once() {
        let mut session = InboundSession::new();
        let packet = raw(&[0, 9, 0, 12, 0, 0, 0, 0, 1, 2, 45, 5]);

        let Inbound::Data { ack, outcome } = session.handle_bytes(packet.clone(), true).unwrap()
        else {
            panic!("expected a data outcome");
        };
        assert_eq!(&ack.to_bytes()[..], &[0, 2, 0, 8, 0, 0, 0, 0]);
        assert_eq!(outcome, DataOutcome::Complete(raw(&[1, 2, 45, 5])));

        // Resubmitted: ACKed again, not delivered again.
        let Inbound::Data { ack, outcome } = session.handle_bytes(packet, true).unwrap() else {
            panic!("expected a data outcome");
        };
        assert_eq!(&ack.to_bytes()[..], &[0, 2, 0, 8, 0, 0, 0, 0]);
        assert_eq!(outcome, DataOutcome::Duplicate);

        let Inbound::Data { ack, outcome } = session
            .handle_bytes(raw(&[0, 9, 0, 11, 0, 0, 0, 1, 83, 212, 43]), true)
            .unwrap()
        else {
            panic!("expected a data outcome");
        };
        assert_eq!(&ack.to_bytes()[..], &[0, 2, 0, 8, 0, 0, 0, 1]);
        assert_eq!(outcome, DataOutcome::Complete(raw(&[83, 212, 43])));
    }

    #[test]
    fn reliable_fragments_are_reassembled() {
        let mut session = InboundSession::new();

        let first = session
            .handle_bytes(raw(&[0, 1, 0, 12, 0, 0, 0, 0, 1, 2, 45, 5]), true)
            .unwrap();
        assert!(matches!(
            first,
            Inbound::Data {
                outcome: DataOutcome::Partial,
                ..
            }
        ));

        let last = session
            .handle_bytes(raw(&[0, 9, 0, 11, 0, 0, 0, 1, 83, 212, 43]), true)
            .unwrap();
        assert!(matches!(
            last,
            Inbound::Data { outcome: DataOutcome::Complete(ref msg), .. }
                if msg[..] == [1, 2, 45, 5, 83, 212, 43]
        ));
    }

    #[test]
    fn completion_is_deferred_without_room() {
        let mut session = InboundSession::new();
        let packet = raw(&[0, 9, 0, 9, 0, 0, 0, 0, 7]);

        assert_eq!(
            session.handle_bytes(packet.clone(), false).unwrap(),
            Inbound::Deferred { sequence: 0 }
        );
        assert_eq!(session.reliable().receive_sequence(), 0);

        assert!(matches!(
            session.handle_bytes(packet, true).unwrap(),
            Inbound::Data {
                outcome: DataOutcome::Complete(_),
                ..
            }
        ));
    }

    #[test]
    fn acks_are_passed_through() {
        let mut session = InboundSession::new();
        assert_eq!(
            session
                .handle_bytes(raw(&[0, 2, 0, 8, 0, 0, 0, 3]), true)
                .unwrap(),
            Inbound::Ack { sequence: 3 }
        );
    }

    #[test]
    fn malformed_datagrams_are_errors() {
        let mut session = InboundSession::new();
        assert!(matches!(
            session.handle_bytes(raw(&[0, 9, 0, 20, 0, 0, 0, 0, 1]), true),
            Err(DecodeError::LengthMismatch { .. })
        ));
        assert_eq!(
            session.handle_bytes(raw(&[0, 1, 0]), true),
            Err(DecodeError::UnexpectedEof)
        );
        assert!(matches!(
            session.handle_bytes(raw(&[0x80, 0, 0, 8, 0, 0, 0, 0]), true),
            Err(DecodeError::UnsupportedFlags(_))
        ));
        assert!(matches!(
            session.handle_bytes(raw(&[0, 0, 0, 8, 0, 0, 0, 0]), true),
            Err(DecodeError::UnsupportedFlags(_))
        ));
    }
}
