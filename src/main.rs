//! levelbot - Twitch chat level-code collector
//!
//! Connects to a chat channel, pulls level codes out of the messages and
//! keeps a deduplicated, sorted collection of them for presentation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use levelbot::client::{ChatClient, ClientEvent};
use levelbot::config::Config;
use levelbot::extract;
use levelbot::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "levelbot.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        server = %config.server,
        nick = %config.nick,
        channels = %config.channel,
        "Starting levelbot"
    );

    let store = Arc::new(Store::new());

    // View-change consumer. A graphical front end would subscribe the same
    // way and repaint the affected rows instead of logging.
    {
        let mut events = store.subscribe();
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                debug!(?event, rows = store.len(), "view changed");
            }
        });
    }

    let mut client = ChatClient::new(
        config.server.clone(),
        config.nick.clone(),
        config.token.clone(),
        config.channels(),
    );
    let handle = client.handle();

    // Wire chat events to the store: every message is scanned for a code,
    // and the config is persisted once a join has been confirmed.
    {
        let store = Arc::clone(&store);
        let config = config.clone();
        let config_path = config_path.clone();
        let config_saved = AtomicBool::new(false);
        client.subscribe(move |event| match event {
            ClientEvent::Message(msg) => {
                if let Some(code) = extract::extract(&msg.text) {
                    store.add_entry(&code, &msg.sender, msg.tags.clone());
                }
            }
            ClientEvent::Joined { channel } => {
                info!(channel = %channel, "joined channel");
                if !config_saved.swap(true, Ordering::Relaxed) {
                    if let Err(err) = config.save(&config_path) {
                        error!(error = %err, "failed to persist config");
                    }
                }
            }
            ClientEvent::AuthRejected => {
                error!("credentials rejected; check the configured oauth token");
            }
            ClientEvent::Disconnected => {
                error!("chat session ended and could not be recovered");
            }
        });
    }

    client.connect().await?;

    let session = tokio::spawn(async move {
        client.run().await;
    });

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    handle.stop();
    session.await?;

    info!(codes = store.total(), "collected codes this session");
    Ok(())
}
