mod control;

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, RwLock},
    time::Duration,
};

use tokio::{net::UdpSocket, sync::mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{ConnectionConfig, ListenConfig},
    context::NetClock,
    protocol::constants::MAX_RECEIVE_SIZE,
    transport::Connection,
};

use control::{SessionEntry, dispatch_control};

/// What the listener reports to server-info, player-info and rule-info
/// queries. Maintained by the game through the `set_*` methods.
#[derive(Debug, Clone, Default)]
pub struct ServerStatus {
    pub hostname: String,
    pub level: String,
    pub players: Vec<PlayerStatus>,
    pub rules: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerStatus {
    pub name: String,
    pub colors: i32,
    pub frags: i32,
    /// Net time at which the player connected.
    pub connect_time: Duration,
    pub address: String,
}

/// Server side of the control protocol. Accepted clients are handed out as
/// [`Connection`]s, each on its own UDP port.
pub struct ListenServer {
    local_addr: SocketAddr,
    new_connections: mpsc::Receiver<Connection>,
    status: Arc<RwLock<ServerStatus>>,
    cancel: CancellationToken,
}

/// Everything the control loop needs besides its socket.
struct ListenState {
    local_addr: SocketAddr,
    config: ListenConfig,
    connection: ConnectionConfig,
    clock: NetClock,
    sessions: HashMap<SocketAddr, SessionEntry>,
    new_conn_tx: mpsc::Sender<Connection>,
    status: Arc<RwLock<ServerStatus>>,
}

impl ListenServer {
    /// Binds the control socket and starts answering requests.
    pub async fn bind(
        listen: &ListenConfig,
        connection: &ConnectionConfig,
        clock: NetClock,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::new(listen.bind_ip, listen.control_port)).await?;
        let local_addr = socket.local_addr()?;

        let (new_conn_tx, new_conn_rx) = mpsc::channel(listen.accept_backlog.max(1));
        let status = Arc::new(RwLock::new(ServerStatus::default()));
        let cancel = CancellationToken::new();

        let state = ListenState {
            local_addr,
            config: listen.clone(),
            connection: connection.clone(),
            clock,
            sessions: HashMap::new(),
            new_conn_tx,
            status: status.clone(),
        };
        tokio::spawn(run_control_loop(socket, state, cancel.clone()));

        tracing::info!(addr = %local_addr, max_clients = listen.max_clients, "listening");

        Ok(Self {
            local_addr,
            new_connections: new_conn_rx,
            status,
            cancel,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the next accepted connection. `None` once the listener is
    /// closed.
    pub async fn accept(&mut self) -> Option<Connection> {
        self.new_connections.recv().await
    }

    /// Returns an already accepted connection without waiting.
    pub fn try_accept(&mut self) -> Option<Connection> {
        self.new_connections.try_recv().ok()
    }

    pub fn set_server_info(&self, hostname: impl Into<String>, level: impl Into<String>) {
        if let Ok(mut guard) = self.status.write() {
            guard.hostname = hostname.into();
            guard.level = level.into();
        }
    }

    pub fn set_players(&self, players: Vec<PlayerStatus>) {
        if let Ok(mut guard) = self.status.write() {
            guard.players = players;
        }
    }

    pub fn set_rules(&self, rules: Vec<(String, String)>) {
        if let Ok(mut guard) = self.status.write() {
            guard.rules = rules;
        }
    }

    /// Gets a copy of the current status.
    pub fn status(&self) -> ServerStatus {
        self.status
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Stops answering the control port. Connections already accepted keep
    /// running.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ListenServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_control_loop(socket: UdpSocket, mut state: ListenState, cancel: CancellationToken) {
    let mut buf = vec![0u8; MAX_RECEIVE_SIZE];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            res = socket.recv_from(&mut buf) => {
                match res {
                    Ok((len, peer)) => {
                        dispatch_control(&socket, &buf[..len], peer, &mut state).await;
                    }
                    Err(e) => {
                        if e.kind() == std::io::ErrorKind::ConnectionReset {
                            // Windows ICMP port unreachable - ignore
                            continue;
                        }
                        tracing::error!("control socket error: {}", e);
                        continue;
                    }
                }
            }
        }
    }

    tracing::info!(addr = %state.local_addr, "listener closed");
}
