use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::protocol::constants::{
    GAME_NAME, NET_PROTOCOL_VERSION, REJECT_INCOMPATIBLE_VERSION, REJECT_SERVER_FULL,
};
use crate::protocol::packet::{
    Accept, ConnectRequest, ControlPacket, PlayerInfoReply, PlayerInfoRequest, Reject,
    RuleInfoReply, RuleInfoRequest, ServerInfoReply, ServerInfoRequest,
};
use crate::transport::Connection;

use super::ListenState;

/// A client the listener has accepted.
pub(super) struct SessionEntry {
    /// Port of the per-client socket, repeated if the client asks again.
    port: u16,
    cancel: CancellationToken,
}

impl SessionEntry {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

pub(super) async fn dispatch_control(
    socket: &UdpSocket,
    bytes: &[u8],
    peer: SocketAddr,
    state: &mut ListenState,
) {
    let packet = match ControlPacket::decode(bytes) {
        Ok(packet) => packet,
        Err(e) => {
            tracing::debug!(peer = %peer, error = %e, "dropping control datagram");
            return;
        }
    };

    let reply = match packet {
        ControlPacket::ConnectRequest(request) => handle_connect(request, peer, state).await,
        ControlPacket::ServerInfoRequest(request) => handle_server_info(request, state),
        ControlPacket::PlayerInfoRequest(request) => handle_player_info(request, state),
        ControlPacket::RuleInfoRequest(request) => Some(handle_rule_info(request, state)),
        other => {
            tracing::debug!(peer = %peer, command = other.id(), "unexpected control command");
            None
        }
    };

    if let Some(reply) = reply
        && let Err(e) = socket.send_to(&reply.encode(), peer).await
    {
        tracing::warn!(peer = %peer, error = %e, "failed to send control reply");
    }
}

async fn handle_connect(
    request: ConnectRequest,
    peer: SocketAddr,
    state: &mut ListenState,
) -> Option<ControlPacket> {
    if request.game != GAME_NAME {
        tracing::debug!(peer = %peer, game = %request.game, "connect request for another game");
        return None;
    }
    if request.protocol_version != NET_PROTOCOL_VERSION {
        tracing::info!(peer = %peer, version = request.protocol_version, "rejecting client");
        return Some(reject(REJECT_INCOMPATIBLE_VERSION));
    }

    state.sessions.retain(|_, session| session.is_live());

    if let Some(existing) = state.sessions.get(&peer) {
        // The client missed our reply and asked again.
        tracing::debug!(peer = %peer, port = existing.port, "repeating accept");
        return Some(Accept { port: u32::from(existing.port) }.into());
    }

    if state.sessions.len() >= state.config.max_clients {
        tracing::info!(peer = %peer, "server full, rejecting client");
        return Some(reject(REJECT_SERVER_FULL));
    }

    let connection = match open_session(peer, state).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!(peer = %peer, error = %e, "failed to open client socket");
            return None;
        }
    };
    let port = connection.local_addr().port();
    let cancel = connection.cancel_token();

    match state.new_conn_tx.try_send(connection) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            tracing::warn!(peer = %peer, "accept backlog full, rejecting client");
            return Some(reject(REJECT_SERVER_FULL));
        }
        Err(TrySendError::Closed(_)) => return None,
    }

    state.sessions.insert(peer, SessionEntry { port, cancel });
    tracing::info!(peer = %peer, port, "client accepted");
    Some(Accept { port: u32::from(port) }.into())
}

/// Binds a fresh socket on the listener's address, connected to the client.
async fn open_session(peer: SocketAddr, state: &ListenState) -> std::io::Result<Connection> {
    let socket = UdpSocket::bind(SocketAddr::new(state.local_addr.ip(), 0)).await?;
    socket.connect(peer).await?;
    Connection::from_socket(socket, &state.connection, state.clock.now())
}

/// Browsers for another game or protocol version get no reply.
fn handle_server_info(request: ServerInfoRequest, state: &ListenState) -> Option<ControlPacket> {
    if request.game != GAME_NAME || request.protocol_version != NET_PROTOCOL_VERSION {
        return None;
    }
    let status = state.status.read().unwrap_or_else(|e| e.into_inner());
    Some(
        ServerInfoReply {
            address: state.local_addr.to_string(),
            hostname: status.hostname.clone(),
            level: status.level.clone(),
            players: clamp_u8(status.players.len()),
            max_players: clamp_u8(state.config.max_clients),
            protocol_version: NET_PROTOCOL_VERSION,
        }
        .into(),
    )
}

/// No reply for an index past the player list.
fn handle_player_info(request: PlayerInfoRequest, state: &ListenState) -> Option<ControlPacket> {
    let status = state.status.read().unwrap_or_else(|e| e.into_inner());
    let player = status.players.get(usize::from(request.player))?;
    let connected_for = state.clock.now().saturating_sub(player.connect_time);
    Some(
        PlayerInfoReply {
            player: request.player,
            name: player.name.clone(),
            colors: player.colors,
            frags: player.frags,
            connect_time: i32::try_from(connected_for.as_secs()).unwrap_or(i32::MAX),
            address: player.address.clone(),
        }
        .into(),
    )
}

/// Empty `previous` asks for the first rule; an unknown or last rule gets an
/// empty reply.
fn handle_rule_info(request: RuleInfoRequest, state: &ListenState) -> ControlPacket {
    let status = state.status.read().unwrap_or_else(|e| e.into_inner());
    let next = if request.previous.is_empty() {
        status.rules.first()
    } else {
        status
            .rules
            .iter()
            .position(|(name, _)| *name == request.previous)
            .and_then(|index| status.rules.get(index + 1))
    };
    RuleInfoReply {
        rule: next.cloned(),
    }
    .into()
}

fn reject(reason: &str) -> ControlPacket {
    Reject {
        reason: reason.to_string(),
    }
    .into()
}

fn clamp_u8(value: usize) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, ListenConfig};
    use crate::context::NetClock;
    use crate::transport::listener::{PlayerStatus, ServerStatus};
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};
    use tokio::sync::mpsc;

    fn state(max_clients: usize) -> (ListenState, mpsc::Receiver<Connection>) {
        let (tx, rx) = mpsc::channel(4);
        let status = ServerStatus {
            hostname: "unit".into(),
            level: "e1m1".into(),
            players: vec![PlayerStatus {
                name: "ranger".into(),
                colors: 0x4d,
                frags: 7,
                ..PlayerStatus::default()
            }],
            rules: vec![
                ("deathmatch".into(), "1".into()),
                ("fraglimit".into(), "20".into()),
            ],
        };
        let state = ListenState {
            local_addr: "127.0.0.1:0".parse().unwrap(),
            config: ListenConfig::default().max_clients(max_clients),
            connection: ConnectionConfig::default(),
            clock: NetClock::new(),
            sessions: HashMap::new(),
            new_conn_tx: tx,
            status: Arc::new(RwLock::new(status)),
        };
        (state, rx)
    }

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[tokio::test]
    async fn repeated_connect_gets_the_same_port() {
        let (mut state, mut rx) = state(4);
        let first = handle_connect(ConnectRequest::current(), peer(40000), &mut state).await;
        let second = handle_connect(ConnectRequest::current(), peer(40000), &mut state).await;

        let Some(ControlPacket::Accept(first)) = first else {
            panic!("expected accept, got {first:?}");
        };
        assert_eq!(second, Some(ControlPacket::Accept(first.clone())));
        assert_eq!(state.sessions.len(), 1);

        let conn = rx.try_recv().unwrap();
        assert_eq!(u32::from(conn.local_addr().port()), first.port);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_server_rejects_until_a_slot_frees() {
        let (mut state, mut rx) = state(1);
        assert!(matches!(
            handle_connect(ConnectRequest::current(), peer(40001), &mut state).await,
            Some(ControlPacket::Accept(_))
        ));
        assert_eq!(
            handle_connect(ConnectRequest::current(), peer(40002), &mut state).await,
            Some(reject(REJECT_SERVER_FULL))
        );

        drop(rx.try_recv().unwrap());
        assert!(matches!(
            handle_connect(ConnectRequest::current(), peer(40002), &mut state).await,
            Some(ControlPacket::Accept(_))
        ));
    }

    #[tokio::test]
    async fn wrong_version_is_rejected() {
        let (mut state, _rx) = state(4);
        let request = ConnectRequest {
            game: GAME_NAME.into(),
            protocol_version: 2,
        };
        assert_eq!(
            handle_connect(request, peer(40003), &mut state).await,
            Some(reject(REJECT_INCOMPATIBLE_VERSION))
        );
        assert!(state.sessions.is_empty());
    }

    #[tokio::test]
    async fn other_games_are_ignored() {
        let (mut state, _rx) = state(4);
        let request = ConnectRequest {
            game: "HEXEN".into(),
            protocol_version: NET_PROTOCOL_VERSION,
        };
        assert_eq!(handle_connect(request, peer(40004), &mut state).await, None);
    }

    #[tokio::test]
    async fn status_queries_read_the_shared_status() {
        let (state, _rx) = state(8);

        let Some(ControlPacket::ServerInfoReply(info)) =
            handle_server_info(ServerInfoRequest::current(), &state)
        else {
            panic!("expected server info");
        };
        assert_eq!(info.hostname, "unit");
        assert_eq!(info.level, "e1m1");
        assert_eq!((info.players, info.max_players), (1, 8));

        let Some(ControlPacket::PlayerInfoReply(player)) =
            handle_player_info(PlayerInfoRequest { player: 0 }, &state)
        else {
            panic!("expected player info");
        };
        assert_eq!(player.name, "ranger");
        assert_eq!(player.frags, 7);
        assert!(handle_player_info(PlayerInfoRequest { player: 1 }, &state).is_none());
    }

    #[tokio::test]
    async fn server_info_ignores_other_versions() {
        let (state, _rx) = state(8);
        let request = ServerInfoRequest {
            game: GAME_NAME.into(),
            protocol_version: 2,
        };
        assert_eq!(handle_server_info(request, &state), None);

        let request = ServerInfoRequest {
            game: "HEXEN".into(),
            protocol_version: NET_PROTOCOL_VERSION,
        };
        assert_eq!(handle_server_info(request, &state), None);
    }

    #[tokio::test]
    async fn rules_are_walked_in_order() {
        let (state, _rx) = state(8);
        let rule = |previous: &str| match handle_rule_info(
            RuleInfoRequest {
                previous: previous.into(),
            },
            &state,
        ) {
            ControlPacket::RuleInfoReply(reply) => reply.rule,
            other => panic!("unexpected {other:?}"),
        };

        assert_eq!(rule(""), Some(("deathmatch".into(), "1".into())));
        assert_eq!(rule("deathmatch"), Some(("fraglimit".into(), "20".into())));
        assert_eq!(rule("fraglimit"), None);
        assert_eq!(rule("nosuchrule"), None);
    }
}
