use std::error::Error;

use tokio_netquake::{Connection, Message, NetConfig, NetworkContext, transport::PlayerStatus};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ctx = NetworkContext::new(NetConfig::default());
    let mut listener = ctx.listen().await?;
    listener.set_server_info("basic_ping", "start");
    listener.set_rules(vec![("deathmatch".into(), "0".into())]);

    println!("Listening on {}", listener.local_addr());

    while let Some(conn) = listener.accept().await {
        println!("[{}] connected", conn.peer_addr());
        listener.set_players(vec![PlayerStatus {
            name: "player".into(),
            connect_time: conn.connect_time(),
            address: conn.peer_addr().to_string(),
            ..PlayerStatus::default()
        }]);
        tokio::spawn(echo(conn));
    }

    Ok(())
}

/// Sends every message back on the channel it arrived on.
async fn echo(mut conn: Connection) {
    let peer = conn.peer_addr();
    loop {
        let message = match conn.receive().await {
            Ok(message) => message,
            Err(e) => {
                println!("[{peer}] gone: {e}");
                return;
            }
        };

        let result = match message {
            Message::Reliable(payload) => {
                while !conn.can_send() && !conn.is_closed() {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                }
                conn.send_reliable(payload)
            }
            Message::Unreliable(payload) => conn.send_unreliable(payload),
        };
        if let Err(e) = result {
            println!("[{peer}] echo failed: {e}");
        }
    }
}
