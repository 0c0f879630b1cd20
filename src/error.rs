//! Error types for the collector.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by [`ChatClient::connect`](crate::client::ChatClient::connect).
///
/// These are connect-time failures only. Read failures during an
/// established session are recovered locally (one reconnect attempt) and
/// never surface as errors; a session that cannot recover ends with a
/// [`Disconnected`](crate::client::ClientEvent::Disconnected) event instead.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The server rejected the supplied credentials.
    ///
    /// Raised when the server closes the connection right after the
    /// credential lines are sent, or refuses it with a connection-aborted
    /// condition.
    #[error("credentials rejected by server")]
    Auth,

    /// Network-level failure while establishing the session.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// The handshake did not complete within the allowed time.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialization failed: {0}")]
    Serialize(#[from] toml::ser::Error),
}
