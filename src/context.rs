use std::time::Duration;

use tokio::time::Instant;

use crate::{
    NetError,
    config::NetConfig,
    protocol::packet::{PlayerInfoReply, ServerInfoReply},
    transport::{Connection, ListenServer, client},
};

/// Monotonic net time, measured from the owning context's creation.
#[derive(Debug, Clone, Copy)]
pub struct NetClock {
    start: Instant,
}

impl NetClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for NetClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry point owning the configuration and the net clock.
///
/// Nothing in the crate is global: every connection and listener is created
/// through a context and stamped with its clock.
#[derive(Debug, Clone, Default)]
pub struct NetworkContext {
    config: NetConfig,
    clock: NetClock,
}

impl NetworkContext {
    pub fn new(config: NetConfig) -> Self {
        Self {
            config,
            clock: NetClock::new(),
        }
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn clock(&self) -> NetClock {
        self.clock
    }

    /// Time elapsed since this context was created.
    pub fn net_time(&self) -> Duration {
        self.clock.now()
    }

    /// Connects to `host` (`"name"`, `"name:port"` or an IP literal). The
    /// control port defaults to the configured listen port.
    pub async fn connect(&self, host: &str) -> Result<Connection, NetError> {
        let server = client::resolve(host, self.config.listen.control_port).await?;
        client::connect(server, &self.config, self.net_time()).await
    }

    /// Starts a listen server on the configured control port.
    pub async fn listen(&self) -> Result<ListenServer, NetError> {
        self.listen_on(self.config.listen.control_port).await
    }

    /// Starts a listen server on `port`; `0` picks an ephemeral port.
    pub async fn listen_on(&self, port: u16) -> Result<ListenServer, NetError> {
        let listen = self.config.listen.clone().control_port(port);
        Ok(ListenServer::bind(&listen, &self.config.connection, self.clock).await?)
    }

    pub async fn query_server_info(&self, host: &str) -> Result<ServerInfoReply, NetError> {
        let server = client::resolve(host, self.config.listen.control_port).await?;
        client::query_server_info(server, self.config.query_timeout).await
    }

    pub async fn query_player_info(
        &self,
        host: &str,
        player: u8,
    ) -> Result<PlayerInfoReply, NetError> {
        let server = client::resolve(host, self.config.listen.control_port).await?;
        client::query_player_info(server, player, self.config.query_timeout).await
    }

    pub async fn query_rules(&self, host: &str) -> Result<Vec<(String, String)>, NetError> {
        let server = client::resolve(host, self.config.listen.control_port).await?;
        client::query_rules(server, self.config.query_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn net_time_advances_with_the_clock() {
        let ctx = NetworkContext::default();
        let before = ctx.net_time();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(ctx.net_time() >= before + Duration::from_secs(3));
    }
}
