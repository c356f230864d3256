//! Reliable channel: stop-and-wait delivery of one message at a time, split
//! into fragments of at most `max_fragment` bytes, each acknowledged before
//! the next one goes out.

use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tokio::time::Instant;

use crate::{
    protocol::constants::{MAX_MESSAGE, NetFlags},
    transport::datagram::Datagram,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    /// No message in flight; a new one may be started.
    Idle,
    /// A fragment is on the wire waiting for its ACK.
    Sending,
}

/// What an incoming ACK did to the send side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    /// Fragment acknowledged and more of the message remains; send this next.
    Next(Datagram),
    /// Final fragment acknowledged; the channel is idle again.
    Complete,
    /// The ACK does not match the fragment in flight.
    Ignored { expected: Option<u32> },
}

#[derive(Debug)]
struct InFlight {
    datagram: Datagram,
    deadline: Instant,
}

/// Send half of the reliable channel. Owned by the write task.
#[derive(Debug)]
pub struct ReliableSender {
    send_sequence: u32,
    ack_sequence: u32,
    pending: Bytes,
    in_flight: Option<InFlight>,
    max_fragment: usize,
    retransmit_timeout: Duration,
}

impl ReliableSender {
    pub fn new(max_fragment: usize, retransmit_timeout: Duration) -> Self {
        Self {
            send_sequence: 0,
            ack_sequence: 0,
            pending: Bytes::new(),
            in_flight: None,
            max_fragment: max_fragment.max(1),
            retransmit_timeout,
        }
    }

    pub fn state(&self) -> SendState {
        if self.in_flight.is_some() {
            SendState::Sending
        } else {
            SendState::Idle
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state() == SendState::Idle
    }

    pub fn send_sequence(&self) -> u32 {
        self.send_sequence
    }

    pub fn ack_sequence(&self) -> u32 {
        self.ack_sequence
    }

    /// When the fragment in flight should be sent again.
    pub fn deadline(&self) -> Option<Instant> {
        self.in_flight.as_ref().map(|f| f.deadline)
    }

    /// Starts sending `message`. Hands the message back untouched if another
    /// one is still in flight.
    pub fn begin(&mut self, message: Bytes, now: Instant) -> Result<Datagram, Bytes> {
        if !self.is_idle() {
            return Err(message);
        }
        self.pending = message;
        Ok(self.transmit_next(now))
    }

    fn transmit_next(&mut self, now: Instant) -> Datagram {
        let len = self.pending.len().min(self.max_fragment);
        let mut flags = NetFlags::DATA;
        if self.pending.len() <= self.max_fragment {
            flags |= NetFlags::EOM;
        }

        let datagram = Datagram::new(flags, self.send_sequence, self.pending.slice(..len));
        self.send_sequence = self.send_sequence.wrapping_add(1);
        self.in_flight = Some(InFlight {
            datagram: datagram.clone(),
            deadline: now + self.retransmit_timeout,
        });
        datagram
    }

    pub fn on_ack(&mut self, sequence: u32, now: Instant) -> AckOutcome {
        let Some(in_flight) = &self.in_flight else {
            return AckOutcome::Ignored { expected: None };
        };
        let expected = self.send_sequence.wrapping_sub(1);
        if sequence != expected || sequence != self.ack_sequence {
            return AckOutcome::Ignored {
                expected: Some(expected),
            };
        }

        let sent = in_flight.datagram.payload.len();
        let was_last = in_flight.datagram.header.flags.contains(NetFlags::EOM);
        self.ack_sequence = self.ack_sequence.wrapping_add(1);
        self.pending.advance(sent);
        self.in_flight = None;

        if was_last {
            self.pending = Bytes::new();
            AckOutcome::Complete
        } else {
            AckOutcome::Next(self.transmit_next(now))
        }
    }

    /// Returns the fragment to resend if its timer has expired, rearming the
    /// timer.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<Datagram> {
        let timeout = self.retransmit_timeout;
        let in_flight = self.in_flight.as_mut()?;
        if now < in_flight.deadline {
            return None;
        }
        in_flight.deadline = now + timeout;
        Some(in_flight.datagram.clone())
    }
}

/// What a received DATA fragment did to the receive side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOutcome {
    /// Already seen (or from the future); acknowledged but not used.
    Duplicate,
    /// Appended; more fragments follow.
    Partial,
    /// Final fragment appended; the whole message.
    Complete(Bytes),
    /// The message would grow past the reassembly limit. Everything buffered
    /// so far is discarded.
    Overflow { size: usize },
}

/// Receive half of the reliable channel. Owned by the read task.
#[derive(Debug)]
pub struct ReliableReceiver {
    receive_sequence: u32,
    reassembly: BytesMut,
    max_message: usize,
}

impl Default for ReliableReceiver {
    fn default() -> Self {
        Self::with_max_message(MAX_MESSAGE)
    }
}

impl ReliableReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_message(max_message: usize) -> Self {
        Self {
            receive_sequence: 0,
            reassembly: BytesMut::new(),
            max_message,
        }
    }

    pub fn receive_sequence(&self) -> u32 {
        self.receive_sequence
    }

    /// Whether a fragment with this sequence would be accepted.
    pub fn expects(&self, sequence: u32) -> bool {
        sequence == self.receive_sequence
    }

    pub fn on_data(&mut self, sequence: u32, eom: bool, payload: &[u8]) -> DataOutcome {
        if !self.expects(sequence) {
            return DataOutcome::Duplicate;
        }
        self.receive_sequence = self.receive_sequence.wrapping_add(1);

        let size = self.reassembly.len() + payload.len();
        if size > self.max_message {
            self.reassembly.clear();
            return DataOutcome::Overflow { size };
        }
        self.reassembly.extend_from_slice(payload);

        if eom {
            DataOutcome::Complete(self.reassembly.split().freeze())
        } else {
            DataOutcome::Partial
        }
    }
}
