mod io;

use std::{
    net::SocketAddr,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use tokio::{
    net::UdpSocket,
    sync::mpsc::{self, error::TryRecvError, error::TrySendError},
};
use tokio_util::sync::CancellationToken;

use crate::{
    NetError,
    config::ConnectionConfig,
    protocol::constants::MAX_DATAGRAM,
    transport::{Message, stats::{NetStats, StatsSnapshot}},
};

/// State shared between a [`Connection`] handle and its two tasks.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) cancel: CancellationToken,
    /// Cleared while a reliable message is queued or in flight.
    pub(crate) reliable_ready: AtomicBool,
    failure: OnceLock<String>,
    pub(crate) stats: NetStats,
}

impl Shared {
    /// Marks the connection broken and stops both tasks.
    pub(crate) fn fail(&self, reason: String) {
        tracing::error!(reason = %reason, "connection broken");
        let _ = self.failure.set(reason);
        self.cancel.cancel();
    }

    fn closed_error(&self) -> NetError {
        match self.failure.get() {
            Some(reason) => NetError::ConnectionBroken(reason.clone()),
            None => NetError::ConnectionClosed,
        }
    }
}

/// One established connection to a peer.
///
/// Created by [`NetworkContext::connect`](crate::NetworkContext::connect) or
/// handed out by [`ListenServer::accept`](crate::ListenServer::accept).
/// Dropping the handle closes the connection.
pub struct Connection {
    peer: SocketAddr,
    local: SocketAddr,
    connect_time: Duration,
    shared: Arc<Shared>,
    inbound_rx: mpsc::Receiver<Message>,
    reliable_tx: mpsc::Sender<Bytes>,
    unreliable_tx: mpsc::Sender<Bytes>,
}

impl Connection {
    /// Starts the read and write tasks on an already connected socket.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_socket(
        socket: UdpSocket,
        config: &ConnectionConfig,
        connect_time: Duration,
    ) -> std::io::Result<Self> {
        let peer = socket.peer_addr()?;
        let local = socket.local_addr()?;
        let socket = Arc::new(socket);

        let shared = Arc::new(Shared {
            reliable_ready: AtomicBool::new(true),
            ..Shared::default()
        });

        // tokio panics on zero-capacity channels.
        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_capacity.max(1));
        let (ack_tx, ack_rx) = mpsc::channel(config.ack_capacity.max(1));
        let (reliable_tx, reliable_rx) = mpsc::channel(config.reliable_capacity.max(1));
        let (unreliable_tx, unreliable_rx) = mpsc::channel(config.unreliable_capacity.max(1));

        tokio::spawn(io::read_loop(
            socket.clone(),
            peer,
            shared.clone(),
            inbound_tx,
            ack_tx,
            config.max_message,
        ));
        tokio::spawn(io::write_loop(
            socket,
            peer,
            shared.clone(),
            io::Outbound {
                reliable_rx,
                unreliable_rx,
                ack_rx,
            },
            config.max_fragment,
            config.retransmit_timeout,
        ));

        tracing::info!(peer = %peer, local = %local, "connection established");

        Ok(Self {
            peer,
            local,
            connect_time,
            shared,
            inbound_rx,
            reliable_tx,
            unreliable_tx,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Net time at which the connection was created.
    pub fn connect_time(&self) -> Duration {
        self.connect_time
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Queues a reliable message. Fails with [`NetError::ReliableBusy`] while
    /// the previous one is still unacknowledged; see [`Connection::can_send`].
    pub fn send_reliable(&self, message: impl Into<Bytes>) -> Result<(), NetError> {
        self.check_open()?;
        if self
            .shared
            .reliable_ready
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(NetError::ReliableBusy);
        }

        match self.reliable_tx.try_send(message.into()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.shared.reliable_ready.store(true, Ordering::Release);
                Err(NetError::ReliableBusy)
            }
            Err(TrySendError::Closed(_)) => Err(self.shared.closed_error()),
        }
    }

    /// Queues an unreliable datagram. Dropped with
    /// [`NetError::UnreliableDropped`] when the send queue is full.
    pub fn send_unreliable(&self, payload: impl Into<Bytes>) -> Result<(), NetError> {
        self.check_open()?;
        let payload = payload.into();
        if payload.len() > MAX_DATAGRAM {
            return Err(NetError::MessageTooLarge(payload.len()));
        }

        match self.unreliable_tx.try_send(payload) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::warn!(peer = %self.peer, "unreliable send queue full");
                Err(NetError::UnreliableDropped)
            }
            Err(TrySendError::Closed(_)) => Err(self.shared.closed_error()),
        }
    }

    /// Returns the next received message, `Ok(None)` when nothing is queued.
    pub fn try_receive(&mut self) -> Result<Option<Message>, NetError> {
        self.check_open()?;
        match self.inbound_rx.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(self.shared.closed_error()),
        }
    }

    /// Waits for the next received message.
    pub async fn receive(&mut self) -> Result<Message, NetError> {
        self.check_open()?;
        let shared = self.shared.clone();
        tokio::select! {
            message = self.inbound_rx.recv() => message.ok_or_else(|| shared.closed_error()),
            _ = shared.cancel.cancelled() => Err(shared.closed_error()),
        }
    }

    /// True when a reliable message would be accepted right now.
    pub fn can_send(&self) -> bool {
        !self.shared.cancel.is_cancelled()
            && self.shared.reliable_ready.load(Ordering::Acquire)
            && self.reliable_tx.capacity() > 0
    }

    /// Stops both tasks. Any reliable message in flight is discarded.
    pub fn close(&self) {
        if !self.shared.cancel.is_cancelled() {
            tracing::info!(peer = %self.peer, "closing connection");
        }
        self.shared.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    fn check_open(&self) -> Result<(), NetError> {
        if self.shared.cancel.is_cancelled() {
            return Err(self.shared.closed_error());
        }
        Ok(())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("local", &self.local)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}
