//! Chat flooder for exercising the collector by hand.
//!
//! Connects to a chat server with the same handshake the collector uses
//! and posts a random level-like code every few seconds. Point a locally
//! running collector at the same channel to watch the list fill up.
//!
//! Usage: `codespam <config.toml>` (same config file as the collector).

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use levelbot::config::Config;
use twirc_proto::{LineCodec, ServerLine};

const SPAM_INTERVAL: Duration = Duration::from_secs(5);

fn random_code() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{:04X} {:04X} {:04X} {:04X}",
        rng.gen_range(0..=0xFFFFu32),
        rng.gen_range(0..=0xFFFFu32),
        rng.gen_range(0..=0xFFFFu32),
        rng.gen_range(0..=0xFFFFu32),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "levelbot.toml".to_string());
    let config = Config::load(&config_path)?;
    let channel = config
        .channels()
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("no channel configured"))?
        .to_lowercase()
        .replace('#', "");

    let host = config
        .server
        .split(':')
        .next()
        .unwrap_or(&config.server)
        .to_owned();
    let stream = TcpStream::connect(&config.server).await?;
    let mut transport = Framed::new(stream, LineCodec::new());

    transport.send(format!("PASS {}", config.token)).await?;
    transport
        .send(format!("NICK {}", config.nick.to_lowercase()))
        .await?;
    transport
        .send(format!("USER {} {} bla :{} Bot", config.nick, host, config.nick))
        .await?;
    transport.send(format!("JOIN #{channel}")).await?;

    info!(channel = %channel, "spamming codes, ctrl-c to stop");

    let mut ticker = tokio::time::interval(SPAM_INTERVAL);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let code = random_code();
                info!(code = %code, "posting");
                transport
                    .send(format!("PRIVMSG #{channel} :{code}"))
                    .await?;
            }
            frame = transport.next() => match frame {
                Some(Ok(line)) => {
                    if let ServerLine::Ping { payload } = ServerLine::parse(&line) {
                        transport.send(format!("PONG {payload}")).await?;
                    }
                }
                Some(Err(err)) => {
                    warn!(error = %err, "read failed");
                    break;
                }
                None => {
                    warn!("server closed the connection");
                    break;
                }
            },
        }
    }

    Ok(())
}
