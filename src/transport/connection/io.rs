use std::{
    io::ErrorKind,
    net::SocketAddr,
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use bytes::Bytes;
use tokio::{
    net::UdpSocket,
    sync::mpsc::{self, error::TrySendError},
    time::{Instant, sleep_until},
};

use crate::{
    protocol::constants::MAX_RECEIVE_SIZE,
    session::{AckOutcome, DataOutcome, Inbound, InboundSession, OutboundSession},
    transport::Message,
};

use super::Shared;

/// ICMP noise reported on a connected UDP socket; not fatal.
fn is_transient(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused | ErrorKind::Interrupted
    )
}

/// Receive direction: drains the socket, acknowledges reliable fragments,
/// forwards ACKs to the write task and delivers messages to the caller.
pub(super) async fn read_loop(
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    shared: Arc<Shared>,
    inbound_tx: mpsc::Sender<Message>,
    ack_tx: mpsc::Sender<u32>,
    max_message: usize,
) {
    let mut session = InboundSession::with_max_message(max_message);
    let mut buf = vec![0u8; MAX_RECEIVE_SIZE];

    loop {
        let len = tokio::select! {
            _ = shared.cancel.cancelled() => break,
            res = socket.recv(&mut buf) => match res {
                Ok(len) => len,
                Err(e) if is_transient(&e) => {
                    tracing::debug!(peer = %peer, error = %e, "ignoring transient receive error");
                    continue;
                }
                Err(e) => {
                    shared.fail(format!("receive failed: {e}"));
                    break;
                }
            },
        };

        shared.stats.received();
        let raw = Bytes::copy_from_slice(&buf[..len]);
        let has_room = inbound_tx.capacity() > 0;

        let inbound = match session.handle_bytes(raw, has_room) {
            Ok(inbound) => inbound,
            Err(e) => {
                shared.stats.invalid();
                tracing::debug!(peer = %peer, len, error = %e, "discarding datagram");
                continue;
            }
        };

        match inbound {
            Inbound::Data { ack, outcome } => {
                if let Err(e) = socket.send(&ack.to_bytes()).await {
                    if !is_transient(&e) {
                        shared.fail(format!("send failed: {e}"));
                        break;
                    }
                } else {
                    shared.stats.sent();
                }

                match outcome {
                    DataOutcome::Duplicate => {
                        shared.stats.duplicate();
                        tracing::debug!(peer = %peer, "duplicate reliable fragment");
                    }
                    DataOutcome::Partial => {
                        tracing::trace!(peer = %peer, "reliable fragment buffered");
                    }
                    DataOutcome::Complete(message) => {
                        if !deliver(&inbound_tx, Message::Reliable(message)) {
                            break;
                        }
                    }
                    DataOutcome::Overflow { size } => {
                        tracing::warn!(peer = %peer, size, max_message, "reliable message too large");
                        shared.fail(format!("reliable message exceeds {max_message} bytes"));
                        break;
                    }
                }
            }
            Inbound::Deferred { sequence } => {
                shared.stats.overflow();
                tracing::debug!(peer = %peer, seq = sequence, "inbound queue full, deferring ACK");
            }
            Inbound::Ack { sequence } => {
                if ack_tx.try_send(sequence).is_err() {
                    tracing::trace!(peer = %peer, seq = sequence, "ACK notification dropped");
                }
            }
            Inbound::Unreliable { payload, skipped } => {
                if skipped > 0 {
                    shared.stats.skipped(skipped);
                    tracing::debug!(peer = %peer, skipped, "unreliable datagrams lost");
                }
                if !has_room {
                    shared.stats.overflow();
                    tracing::warn!(peer = %peer, "inbound queue full, unreliable datagram dropped");
                    continue;
                }
                if !deliver(&inbound_tx, Message::Unreliable(payload)) {
                    break;
                }
            }
            Inbound::Stale { sequence, expected } => {
                shared.stats.stale();
                tracing::debug!(peer = %peer, seq = sequence, expected, "stale unreliable datagram");
            }
        }
    }

    tracing::trace!(peer = %peer, "read task finished");
}

/// Hands a message to the caller. Only this task produces into the queue,
/// so room checked earlier is still there. False once the handle is gone.
fn deliver(inbound_tx: &mpsc::Sender<Message>, message: Message) -> bool {
    match inbound_tx.try_send(message) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!("inbound queue full, message dropped");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Queues feeding the write task.
pub(super) struct Outbound {
    pub(super) reliable_rx: mpsc::Receiver<Bytes>,
    pub(super) unreliable_rx: mpsc::Receiver<Bytes>,
    pub(super) ack_rx: mpsc::Receiver<u32>,
}

/// Send direction: frames outgoing messages, retransmits on timeout and
/// advances the reliable window on ACKs.
pub(super) async fn write_loop(
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    shared: Arc<Shared>,
    mut queues: Outbound,
    max_fragment: usize,
    retransmit_timeout: Duration,
) {
    let mut session = OutboundSession::new(max_fragment, retransmit_timeout);

    loop {
        let deadline = session.retransmit_deadline();
        let idle = session.can_send_reliable();

        let datagram = tokio::select! {
            biased;

            _ = shared.cancel.cancelled() => break,

            Some(sequence) = queues.ack_rx.recv() => {
                match session.on_ack(sequence, Instant::now()) {
                    AckOutcome::Next(datagram) => Some(datagram),
                    AckOutcome::Complete => {
                        tracing::trace!(peer = %peer, seq = sequence, "reliable message acknowledged");
                        shared.reliable_ready.store(true, Ordering::Release);
                        None
                    }
                    AckOutcome::Ignored { expected } => {
                        tracing::warn!(peer = %peer, seq = sequence, ?expected, "unexpected ACK");
                        None
                    }
                }
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let datagram = session.poll_retransmit(Instant::now());
                if let Some(datagram) = &datagram {
                    shared.stats.resent();
                    tracing::debug!(peer = %peer, seq = datagram.header.sequence, "retransmitting");
                }
                datagram
            }

            Some(message) = queues.reliable_rx.recv(), if idle => {
                match session.queue_reliable(message, Instant::now()) {
                    Ok(datagram) => Some(datagram),
                    Err(_) => {
                        tracing::warn!(peer = %peer, "reliable message arrived while another is in flight");
                        None
                    }
                }
            }

            Some(payload) = queues.unreliable_rx.recv() => Some(session.queue_unreliable(payload)),

            else => break,
        };

        let Some(datagram) = datagram else {
            continue;
        };

        tracing::trace!(
            peer = %peer,
            flags = ?datagram.header.flags,
            seq = datagram.header.sequence,
            len = datagram.wire_len(),
            "send"
        );
        match socket.send(&datagram.to_bytes()).await {
            Ok(_) => shared.stats.sent(),
            Err(e) if is_transient(&e) => {
                tracing::debug!(peer = %peer, error = %e, "ignoring transient send error");
            }
            Err(e) => {
                shared.fail(format!("send failed: {e}"));
                break;
            }
        }
    }

    tracing::trace!(peer = %peer, "write task finished");
}
