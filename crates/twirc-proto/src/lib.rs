//! # twirc-proto
//!
//! A small protocol library for the Twitch-flavored subset of IRC used by
//! chat tooling: newline framing, positional classification of inbound
//! server lines, and typed parsing of the `twitch.tv/tags` metadata blob.
//!
//! The library is deliberately lenient. Chat input is untrusted, so parsing
//! never panics and malformed input degrades to defaults ([`tags::TagBag`])
//! or to an unrecognized line ([`message::ServerLine::Other`]) instead of
//! returning errors.
//!
//! ## Quick Start
//!
//! ```rust
//! use twirc_proto::{ServerLine, TagBag};
//!
//! let raw = "@subscriber=1;user-type=mod;display-name=Foo \
//!            :foo!foo@foo.tmi.twitch.tv PRIVMSG #somechannel :hello there";
//!
//! if let ServerLine::Privmsg { tags, sender, channel, text } = ServerLine::parse(raw) {
//!     let bag = TagBag::parse(tags.as_deref().unwrap_or(""), Some(&channel));
//!     assert_eq!(sender, "foo");
//!     assert_eq!(text, "hello there");
//!     assert!(bag.subscriber);
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod line;
pub mod message;
pub mod tags;

pub use self::error::ProtocolError;
pub use self::line::LineCodec;
pub use self::message::ServerLine;
pub use self::tags::{TagBag, UserType};
