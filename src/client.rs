//! The chat client: handshake, receive loop, reconnection, dispatch.
//!
//! One client owns one connection to the chat server and runs its receive
//! loop on whatever task calls [`ChatClient::run`]. Every recognized line
//! becomes a [`ClientEvent`] delivered synchronously, in arrival order, to
//! subscribers in registration order. There is no concurrent dispatch: a
//! handler that blocks stalls line processing and, transitively, keep-alive
//! replies. That is a known limitation — handlers must stay cheap and hand
//! real work to another task.
//!
//! Read failures during a session are recovered with a single reconnect
//! attempt (full handshake, including joins). If that attempt fails the
//! session is over: a terminal event is dispatched and the loop returns.
//! The client can then be connected and run again.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use twirc_proto::{LineCodec, ProtocolError, ServerLine, TagBag};

use crate::error::ConnectError;

/// How long the TCP connect and each handshake read may take.
///
/// The reference behavior had no handshake timeout at all; this bound is a
/// deliberate hardening so a black-holed server cannot wedge `connect`.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause before reconnecting after the server closes the stream, so a
/// flapping server is not hammered with connection attempts.
const STALL_BACKOFF: Duration = Duration::from_secs(1);

/// A chat message received from a joined channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Channel the message was posted to, without the leading `#`.
    pub channel: String,
    /// Sender nickname, lowercased.
    pub sender: String,
    /// Parsed metadata, when the server attached any.
    pub tags: Option<TagBag>,
    /// Message text.
    pub text: String,
}

/// Events dispatched to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A channel message arrived.
    Message(MessageEvent),
    /// The server confirmed a channel join.
    Joined {
        /// The joined channel, without the leading `#`.
        channel: String,
    },
    /// The server rejected the credentials.
    AuthRejected,
    /// The session ended and could not be recovered.
    Disconnected,
}

/// Token identifying one subscription, for [`ClientHandle::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

struct Shared {
    handlers: Mutex<Vec<(HandlerId, Handler)>>,
    next_id: AtomicU64,
    cancel: CancellationToken,
}

impl Shared {
    fn subscribe(&self, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, handler));
        id
    }

    fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(hid, _)| *hid != id);
        handlers.len() != before
    }

    fn dispatch(&self, event: &ClientEvent) {
        // Handlers run outside the registry lock so they may themselves
        // subscribe or unsubscribe.
        let handlers: Vec<Handler> = self.handlers.lock().iter().map(|(_, h)| h.clone()).collect();
        for handler in handlers {
            handler(event);
        }
    }
}

/// A cheap handle for interacting with a client from other tasks.
#[derive(Clone)]
pub struct ClientHandle {
    shared: Arc<Shared>,
}

impl ClientHandle {
    /// Register an event handler. Handlers are called in registration
    /// order.
    pub fn subscribe(&self, handler: impl Fn(&ClientEvent) + Send + Sync + 'static) -> HandlerId {
        self.shared.subscribe(Arc::new(handler))
    }

    /// Remove a handler. Returns whether it was still registered.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        self.shared.unsubscribe(id)
    }

    /// Ask the receive loop to exit at its next iteration boundary.
    ///
    /// Signals and returns immediately; the loop cannot be preempted
    /// mid-read, so expect a bounded delay before it actually exits.
    pub fn stop(&self) {
        self.shared.cancel.cancel();
    }
}

/// The connection to the chat server.
pub struct ChatClient {
    server: String,
    nick: String,
    token: String,
    channels: Vec<String>,
    shared: Arc<Shared>,
    transport: Option<Framed<TcpStream, LineCodec>>,
}

impl ChatClient {
    /// Create a client for `server` (`host:port`) joining `channels`.
    pub fn new(
        server: impl Into<String>,
        nick: impl Into<String>,
        token: impl Into<String>,
        channels: Vec<String>,
    ) -> ChatClient {
        ChatClient {
            server: server.into(),
            nick: nick.into(),
            token: token.into(),
            channels,
            shared: Arc::new(Shared {
                handlers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                cancel: CancellationToken::new(),
            }),
            transport: None,
        }
    }

    /// A handle usable from other tasks.
    pub fn handle(&self) -> ClientHandle {
        ClientHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Register an event handler on this client directly.
    pub fn subscribe(&self, handler: impl Fn(&ClientEvent) + Send + Sync + 'static) -> HandlerId {
        self.shared.subscribe(Arc::new(handler))
    }

    /// Open the connection and perform the handshake: credentials,
    /// registration, tag capability, one join per channel.
    ///
    /// The server signals bad credentials by closing the connection right
    /// after they are sent, so an empty first read maps to
    /// [`ConnectError::Auth`], as does a connection-aborted refusal.
    pub async fn connect(&mut self) -> Result<(), ConnectError> {
        self.transport = None;

        let stream = match timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.server)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionAborted => {
                return Err(ConnectError::Auth);
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(ConnectError::Timeout(CONNECT_TIMEOUT)),
        };
        let mut transport = Framed::new(stream, LineCodec::new());

        let host = self.server.split(':').next().unwrap_or(&self.server).to_owned();
        transport
            .send(format!("PASS {}", self.token))
            .await
            .map_err(connect_err)?;
        transport
            .send(format!("NICK {}", self.nick.to_lowercase()))
            .await
            .map_err(connect_err)?;
        transport
            .send(format!("USER {} {} bla :{} Bot", self.nick, host, self.nick))
            .await
            .map_err(connect_err)?;

        // One read settles the credentials: a rejecting server hangs up
        // without a word.
        match timeout(CONNECT_TIMEOUT, transport.next()).await {
            Ok(Some(Ok(line))) => trace!(line = %line, "handshake reply"),
            Ok(Some(Err(e))) => return Err(connect_err(e)),
            Ok(None) => return Err(ConnectError::Auth),
            Err(_) => return Err(ConnectError::Timeout(CONNECT_TIMEOUT)),
        }

        transport
            .send("CAP REQ :twitch.tv/tags".to_owned())
            .await
            .map_err(connect_err)?;

        for channel in &self.channels {
            let channel = channel.to_lowercase().replace('#', "");
            transport
                .send(format!("JOIN #{channel}"))
                .await
                .map_err(connect_err)?;
        }

        info!(server = %self.server, nick = %self.nick, "connected");
        self.transport = Some(transport);
        Ok(())
    }

    /// Run the receive loop until the session ends or [`ClientHandle::stop`]
    /// is called. Requires a prior successful [`connect`](Self::connect).
    pub async fn run(&mut self) {
        let cancel = self.shared.cancel.clone();
        loop {
            let Some(transport) = self.transport.as_mut() else {
                warn!("run called without an established connection");
                return;
            };

            let frame = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("receive loop stopped");
                    return;
                }
                frame = transport.next() => frame,
            };

            match frame {
                Some(Ok(line)) => self.handle_line(&line).await,
                Some(Err(err)) => {
                    warn!(error = %err, "read failed, attempting reconnect");
                    if !self.try_reconnect().await {
                        return;
                    }
                }
                None => {
                    // Server closed the stream without an error.
                    debug!("stream ended, reconnecting after backoff");
                    sleep(STALL_BACKOFF).await;
                    if !self.try_reconnect().await {
                        return;
                    }
                }
            }
        }
    }

    /// One reconnect attempt. On failure the session is declared over and
    /// the terminal event dispatched; returns whether the loop continues.
    async fn try_reconnect(&mut self) -> bool {
        match self.connect().await {
            Ok(()) => true,
            Err(ConnectError::Auth) => {
                warn!("reconnect rejected: bad credentials");
                self.shared.dispatch(&ClientEvent::AuthRejected);
                false
            }
            Err(err) => {
                warn!(error = %err, "reconnect failed, session over");
                self.shared.dispatch(&ClientEvent::Disconnected);
                false
            }
        }
    }

    async fn handle_line(&mut self, line: &str) {
        match ServerLine::parse(line) {
            ServerLine::Privmsg {
                tags,
                sender,
                channel,
                text,
            } => {
                let tags = tags.map(|raw| TagBag::parse(&raw, Some(&channel)));
                self.shared.dispatch(&ClientEvent::Message(MessageEvent {
                    channel,
                    sender,
                    tags,
                    text,
                }));
            }
            ServerLine::NamesReply { channel } => {
                info!(channel = %channel, "join confirmed");
                self.shared.dispatch(&ClientEvent::Joined { channel });
            }
            ServerLine::LoginRejected => {
                warn!("server rejected login");
                self.shared.dispatch(&ClientEvent::AuthRejected);
            }
            ServerLine::Ping { payload } => {
                // Answer before touching the next line; the server drops
                // clients that dawdle.
                if let Some(transport) = self.transport.as_mut() {
                    if let Err(err) = transport.send(format!("PONG {payload}")).await {
                        warn!(error = %err, "keep-alive reply failed");
                    }
                }
            }
            ServerLine::Other => trace!(line = %line, "ignored line"),
        }
    }
}

fn connect_err(err: ProtocolError) -> ConnectError {
    match err {
        ProtocolError::Io(e) if e.kind() == io::ErrorKind::ConnectionAborted => ConnectError::Auth,
        ProtocolError::Io(e) => ConnectError::Transport(e),
        other => ConnectError::Transport(io::Error::other(other)),
    }
}
