//! Client side of the control protocol: the connect handshake and the
//! server-info / player-info / rule-info queries.

use std::{
    future::Future,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

use tokio::net::{UdpSocket, lookup_host};

use crate::{
    NetError,
    config::NetConfig,
    protocol::{
        constants::MAX_RECEIVE_SIZE,
        packet::{
            ConnectRequest, ControlPacket, DecodeError, PlayerInfoReply, PlayerInfoRequest,
            RuleInfoRequest, ServerInfoReply, ServerInfoRequest,
        },
    },
    transport::Connection,
};

/// Resolves `host` or `host:port`, falling back to `default_port`.
pub async fn resolve(host: &str, default_port: u16) -> Result<SocketAddr, NetError> {
    if let Ok(addr) = host.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    let has_port = host
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
    let target = if has_port {
        host.to_string()
    } else {
        format!("{host}:{default_port}")
    };

    lookup_host(&target)
        .await
        .map_err(|_| NetError::AddressResolution(host.to_string()))?
        .next()
        .ok_or_else(|| NetError::AddressResolution(host.to_string()))
}

/// Performs the connect handshake against `server`'s control port and, on
/// accept, returns a connection bound to the port the server handed out.
pub async fn connect(
    server: SocketAddr,
    config: &NetConfig,
    connect_time: Duration,
) -> Result<Connection, NetError> {
    let socket = bind_for(server).await?;
    tracing::debug!(server = %server, local = %socket.local_addr()?, "sending connect request");
    send_control(&socket, server, ConnectRequest::current().into()).await?;

    let reply = with_timeout(config.handshake_timeout, recv_control(&socket, server)).await?;
    match reply {
        ControlPacket::Accept(accept) => {
            let port = u16::try_from(accept.port).map_err(|_| NetError::MalformedReply)?;
            if port == 0 {
                return Err(NetError::MalformedReply);
            }
            let remote = SocketAddr::new(server.ip(), port);
            socket.connect(remote).await?;
            tracing::info!(server = %server, remote = %remote, "connection accepted");
            Ok(Connection::from_socket(socket, &config.connection, connect_time)?)
        }
        ControlPacket::Reject(reject) => {
            tracing::info!(server = %server, reason = %reject.reason, "connection rejected");
            Err(NetError::Rejected(reject.reason))
        }
        other => Err(NetError::BadResponse(other.id())),
    }
}

pub async fn query_server_info(
    server: SocketAddr,
    timeout: Duration,
) -> Result<ServerInfoReply, NetError> {
    let socket = bind_for(server).await?;
    match request(&socket, server, ServerInfoRequest::current().into(), timeout).await? {
        ControlPacket::ServerInfoReply(info) => Ok(info),
        other => Err(NetError::BadResponse(other.id())),
    }
}

/// The server stays silent for an unknown index, which surfaces as
/// [`NetError::HandshakeTimeout`].
pub async fn query_player_info(
    server: SocketAddr,
    player: u8,
    timeout: Duration,
) -> Result<PlayerInfoReply, NetError> {
    let socket = bind_for(server).await?;
    match request(&socket, server, PlayerInfoRequest { player }.into(), timeout).await? {
        ControlPacket::PlayerInfoReply(info) => Ok(info),
        other => Err(NetError::BadResponse(other.id())),
    }
}

/// Walks the rule list one request at a time until the server sends an
/// empty reply.
pub async fn query_rules(
    server: SocketAddr,
    timeout: Duration,
) -> Result<Vec<(String, String)>, NetError> {
    let socket = bind_for(server).await?;
    let mut rules = Vec::new();
    let mut previous = String::new();

    loop {
        let packet = RuleInfoRequest {
            previous: previous.clone(),
        };
        let rule = match request(&socket, server, packet.into(), timeout).await? {
            ControlPacket::RuleInfoReply(reply) => reply.rule,
            other => return Err(NetError::BadResponse(other.id())),
        };
        let Some((name, value)) = rule else {
            break;
        };
        // A server that repeats itself would loop forever.
        if rules.iter().any(|(seen, _): &(String, String)| *seen == name) {
            break;
        }
        previous = name.clone();
        rules.push((name, value));
    }

    Ok(rules)
}

async fn bind_for(server: SocketAddr) -> Result<UdpSocket, NetError> {
    let any = match server {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    Ok(UdpSocket::bind(SocketAddr::new(any, 0)).await?)
}

async fn request(
    socket: &UdpSocket,
    server: SocketAddr,
    packet: ControlPacket,
    timeout: Duration,
) -> Result<ControlPacket, NetError> {
    send_control(socket, server, packet).await?;
    with_timeout(Some(timeout), recv_control(socket, server)).await
}

async fn send_control(
    socket: &UdpSocket,
    server: SocketAddr,
    packet: ControlPacket,
) -> Result<(), NetError> {
    socket.send_to(&packet.encode(), server).await?;
    Ok(())
}

/// Waits for one control datagram from `server`, ignoring other senders.
async fn recv_control(socket: &UdpSocket, server: SocketAddr) -> Result<ControlPacket, NetError> {
    let mut buf = vec![0u8; MAX_RECEIVE_SIZE];
    loop {
        let (len, from) = socket.recv_from(&mut buf).await?;
        if from != server {
            tracing::debug!(from = %from, server = %server, "ignoring datagram from unexpected address");
            continue;
        }
        return match ControlPacket::decode(&buf[..len]) {
            Ok(packet) => Ok(packet),
            Err(DecodeError::UnknownCommand(command)) => Err(NetError::BadResponse(command)),
            Err(e) => {
                tracing::debug!(server = %server, error = %e, "malformed control reply");
                Err(NetError::MalformedReply)
            }
        };
    }
}

async fn with_timeout<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = Result<T, NetError>>,
) -> Result<T, NetError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| NetError::HandshakeTimeout)?,
        None => fut.await,
    }
}
