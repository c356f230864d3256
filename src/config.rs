//! Transport configuration.
//!
//! Every queue capacity and timer the transport relies on is spelled out
//! here so tests (and games) can tune overflow behaviour explicitly.

use std::{
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

use crate::protocol::constants::{
    DEFAULT_CONTROL_PORT, MAX_DATAGRAM, MAX_MESSAGE, RETRANSMIT_TIMEOUT,
};

/// Per-connection queue sizes and timers.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Messages buffered between the read task and the caller.
    pub inbound_capacity: usize,
    /// ACK notifications buffered between the read task and the write task.
    /// Overflowing notifications are dropped.
    pub ack_capacity: usize,
    /// Reliable messages waiting for the write task. One in flight is the
    /// protocol's limit, so anything above 1 only adds latency.
    pub reliable_capacity: usize,
    /// Unreliable datagrams waiting for the write task. Overflow is dropped.
    pub unreliable_capacity: usize,
    pub retransmit_timeout: Duration,
    /// Largest reliable fragment payload.
    pub max_fragment: usize,
    /// Largest reliable message accepted from the peer. A peer that sends
    /// more before its final fragment breaks the connection.
    pub max_message: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: 64,
            ack_capacity: 8,
            reliable_capacity: 1,
            unreliable_capacity: 32,
            retransmit_timeout: RETRANSMIT_TIMEOUT,
            max_fragment: MAX_DATAGRAM,
            max_message: MAX_MESSAGE,
        }
    }
}

impl ConnectionConfig {
    pub fn inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity;
        self
    }

    pub fn ack_capacity(mut self, capacity: usize) -> Self {
        self.ack_capacity = capacity;
        self
    }

    pub fn reliable_capacity(mut self, capacity: usize) -> Self {
        self.reliable_capacity = capacity;
        self
    }

    pub fn unreliable_capacity(mut self, capacity: usize) -> Self {
        self.unreliable_capacity = capacity;
        self
    }

    pub fn retransmit_timeout(mut self, timeout: Duration) -> Self {
        self.retransmit_timeout = timeout;
        self
    }

    /// Clamped to `1..=MAX_DATAGRAM`; the header length field cannot describe
    /// anything larger.
    pub fn max_fragment(mut self, max_fragment: usize) -> Self {
        self.max_fragment = max_fragment.clamp(1, MAX_DATAGRAM);
        self
    }

    pub fn max_message(mut self, max_message: usize) -> Self {
        self.max_message = max_message;
        self
    }
}

/// Listen server settings.
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// Address the control socket and per-client sockets bind to.
    pub bind_ip: IpAddr,
    pub control_port: u16,
    /// Live sessions allowed before connect requests are rejected.
    pub max_clients: usize,
    /// Accepted connections waiting for `ListenServer::accept`.
    pub accept_backlog: usize,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            control_port: DEFAULT_CONTROL_PORT,
            max_clients: 16,
            accept_backlog: 16,
        }
    }
}

impl ListenConfig {
    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind_ip = ip;
        self
    }

    pub fn control_port(mut self, port: u16) -> Self {
        self.control_port = port;
        self
    }

    pub fn max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    pub fn accept_backlog(mut self, backlog: usize) -> Self {
        self.accept_backlog = backlog;
        self
    }
}

#[derive(Debug, Clone)]
pub struct NetConfig {
    pub connection: ConnectionConfig,
    pub listen: ListenConfig,
    /// How long `connect` waits for the server's reply. `None` waits forever.
    pub handshake_timeout: Option<Duration>,
    /// How long a server query waits for each reply.
    pub query_timeout: Duration,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            listen: ListenConfig::default(),
            handshake_timeout: None,
            query_timeout: Duration::from_secs(2),
        }
    }
}

impl NetConfig {
    pub fn connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }

    pub fn listen(mut self, listen: ListenConfig) -> Self {
        self.listen = listen;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}
