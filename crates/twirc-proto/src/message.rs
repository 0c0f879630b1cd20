//! Classification of inbound server lines.
//!
//! Chat ingestion only cares about four line shapes: tagged channel
//! messages, the numeric 353 membership confirmation, the login-rejection
//! notice, and keep-alive probes. Everything else is [`ServerLine::Other`]
//! and gets dropped by the caller.
//!
//! Recognition is positional over space-separated tokens. A tagged channel
//! message looks like:
//!
//! ```text
//! @subscriber=1;... :nick!user@host PRIVMSG #channel :message text
//! ```

/// One classified server line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    /// A channel message with its metadata blob still unparsed.
    Privmsg {
        /// Raw tag blob (token 0) when present, without further processing.
        tags: Option<String>,
        /// Sender nickname, lowercased.
        sender: String,
        /// Channel name without the leading `#`, lowercased.
        channel: String,
        /// Message text with the leading `:` sentinel stripped.
        text: String,
    },
    /// Numeric 353 (RPL_NAMREPLY): the server confirmed the channel join.
    NamesReply {
        /// Channel name without the leading `#`.
        channel: String,
    },
    /// The server rejected the supplied credentials.
    LoginRejected,
    /// Keep-alive probe; must be echoed back as `PONG <payload>`.
    Ping {
        /// Probe payload to echo.
        payload: String,
    },
    /// Any line that matches none of the recognized shapes.
    Other,
}

impl ServerLine {
    /// Classify one raw line (without its trailing CRLF).
    ///
    /// Never fails: unrecognized or malformed lines are [`ServerLine::Other`].
    pub fn parse(line: &str) -> ServerLine {
        let tokens: Vec<&str> = line.split(' ').collect();

        if tokens.len() >= 5 && tokens[2] == "PRIVMSG" {
            let tags = tokens[0]
                .starts_with('@')
                .then(|| tokens[0].to_owned());
            let sender = tokens[1]
                .split('!')
                .next()
                .unwrap_or("")
                .trim_start_matches(':')
                .to_lowercase();
            let channel = tokens[3].trim_start_matches('#').to_lowercase();
            let text = tokens[4..].join(" ");
            let text = text.strip_prefix(':').unwrap_or(&text).to_owned();
            return ServerLine::Privmsg {
                tags,
                sender,
                channel,
                text,
            };
        }

        if tokens.len() >= 6 && tokens[1] == "353" {
            return ServerLine::NamesReply {
                channel: tokens[4].trim_start_matches('#').to_owned(),
            };
        }

        if tokens.len() >= 5 && tokens[3] == ":Login" && tokens[4] == "unsuccessful" {
            return ServerLine::LoginRejected;
        }

        if tokens[0] == "PING" {
            return ServerLine::Ping {
                payload: tokens.get(1).unwrap_or(&"").to_string(),
            };
        }

        ServerLine::Other
    }
}
