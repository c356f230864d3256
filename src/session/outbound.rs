use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::{
    session::{
        reliable::{AckOutcome, ReliableSender},
        unreliable::UnreliableSender,
    },
    transport::datagram::Datagram,
};

/// Send-direction state of one connection. Owned by the write task.
#[derive(Debug)]
pub struct OutboundSession {
    reliable: ReliableSender,
    unreliable: UnreliableSender,
}

impl OutboundSession {
    pub fn new(max_fragment: usize, retransmit_timeout: Duration) -> Self {
        Self {
            reliable: ReliableSender::new(max_fragment, retransmit_timeout),
            unreliable: UnreliableSender::new(),
        }
    }

    pub fn reliable(&self) -> &ReliableSender {
        &self.reliable
    }

    pub fn unreliable(&self) -> &UnreliableSender {
        &self.unreliable
    }

    pub fn can_send_reliable(&self) -> bool {
        self.reliable.is_idle()
    }

    pub fn queue_reliable(&mut self, message: Bytes, now: Instant) -> Result<Datagram, Bytes> {
        self.reliable.begin(message, now)
    }

    pub fn queue_unreliable(&mut self, payload: Bytes) -> Datagram {
        self.unreliable.frame(payload)
    }

    pub fn on_ack(&mut self, sequence: u32, now: Instant) -> AckOutcome {
        self.reliable.on_ack(sequence, now)
    }

    pub fn retransmit_deadline(&self) -> Option<Instant> {
        self.reliable.deadline()
    }

    pub fn poll_retransmit(&mut self, now: Instant) -> Option<Datagram> {
        self.reliable.poll_timeout(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::NetFlags;

    #[test]
    fn unreliable_traffic_does_not_touch_reliable_state() {
        let now = Instant::now();
        let mut session = OutboundSession::new(16, Duration::from_secs(1));

        session
            .queue_reliable(Bytes::from_static(b"state"), now)
            .unwrap();
        let dgram = session.queue_unreliable(Bytes::from_static(b"pos"));
        assert_eq!(dgram.header.flags, NetFlags::UNRELIABLE);
        assert_eq!(dgram.header.sequence, 0);

        assert!(!session.can_send_reliable());
        assert_eq!(session.reliable().send_sequence(), 1);
        assert_eq!(session.unreliable().send_sequence(), 1);
        assert!(session.retransmit_deadline().is_some());
    }
}
