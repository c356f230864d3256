use std::error::Error;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio_netquake::{Message, NetConfig, NetworkContext};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let host = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1".into());
    let ctx = NetworkContext::new(
        NetConfig::default().handshake_timeout(Some(Duration::from_secs(5))),
    );

    let info = ctx.query_server_info(&host).await?;
    println!(
        "{} ({}) on {}: {}/{} players",
        info.hostname, info.address, info.level, info.players, info.max_players
    );

    let mut conn = ctx.connect(&host).await?;
    println!("Connected to {}", conn.peer_addr());

    for i in 0..5u32 {
        while !conn.can_send() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let sent = Instant::now();
        conn.send_reliable(Bytes::from(format!("ping {i}")))?;
        match conn.receive().await? {
            Message::Reliable(reply) => println!(
                "reliable {} in {:?}",
                String::from_utf8_lossy(&reply),
                sent.elapsed()
            ),
            Message::Unreliable(_) => println!("unexpected unreliable reply"),
        }

        let sent = Instant::now();
        conn.send_unreliable(Bytes::from(format!("tick {i}")))?;
        match tokio::time::timeout(Duration::from_secs(1), conn.receive()).await {
            Ok(Ok(reply)) => println!(
                "unreliable {} in {:?}",
                String::from_utf8_lossy(reply.payload()),
                sent.elapsed()
            ),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => println!("unreliable tick {i} lost"),
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    println!("{:?}", conn.stats());
    conn.close();
    Ok(())
}
