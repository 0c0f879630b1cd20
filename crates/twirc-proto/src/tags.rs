//! Chat tag parsing.
//!
//! The `twitch.tv/tags` capability attaches a semicolon-delimited
//! `key=value` blob to every channel message. This module turns that blob
//! into a closed, typed bag with an explicit default for every field, so
//! absence is never represented by a missing key.
//!
//! Parsing never fails. Tags ride on untrusted chat input and must not be
//! able to take down ingestion, so malformed or missing fields degrade to
//! their defaults.

/// Privilege level reported by the server, lowest to highest.
///
/// `Broadcaster` never appears on the wire; it is forced when the display
/// name matches the channel being read (the channel owner is reported as a
/// plain user otherwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum UserType {
    /// No special privilege.
    #[default]
    Empty,
    /// Channel moderator.
    Mod,
    /// Channel owner.
    Broadcaster,
    /// Network-wide moderator.
    GlobalMod,
    /// Network administrator.
    Admin,
    /// Network staff.
    Staff,
}

impl UserType {
    /// Coerce a wire value to a privilege level.
    ///
    /// Unrecognized or missing values are `Empty`.
    pub fn from_wire(value: &str) -> UserType {
        match value.trim().to_lowercase().as_str() {
            "mod" => UserType::Mod,
            "global_mod" => UserType::GlobalMod,
            "admin" => UserType::Admin,
            "staff" => UserType::Staff,
            _ => UserType::Empty,
        }
    }
}

/// Parsed per-message metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagBag {
    /// Sender is subscribed to the channel.
    pub subscriber: bool,
    /// Sender has the legacy turbo flag.
    pub turbo: bool,
    /// Sender privilege level.
    pub user_type: UserType,
    /// Sender display name; empty when the server sent none.
    pub display_name: String,
}

impl TagBag {
    /// Parse a raw tag blob, with or without its leading `@`.
    ///
    /// Splits on `;`, then on the first `=` per segment (last occurrence of
    /// a key wins), unescapes values, and coerces the known fields. If
    /// `channel` is given and the display name matches it case-insensitively,
    /// the privilege level is forced to [`UserType::Broadcaster`].
    pub fn parse(raw: &str, channel: Option<&str>) -> TagBag {
        let mut bag = TagBag::default();

        let raw = raw.strip_prefix('@').unwrap_or(raw);
        for segment in raw.split(';').filter(|s| !s.is_empty()) {
            let mut iter = segment.splitn(2, '=');
            let key = iter.next().unwrap_or("");
            let value = unescape_tag_value(iter.next().unwrap_or(""));

            match key {
                "subscriber" => bag.subscriber = value == "1",
                "turbo" => bag.turbo = value == "1",
                "user-type" => bag.user_type = UserType::from_wire(&value),
                "display-name" => bag.display_name = value,
                _ => {}
            }
        }

        if let Some(channel) = channel {
            if !bag.display_name.is_empty() && bag.display_name.eq_ignore_ascii_case(channel) {
                bag.user_type = UserType::Broadcaster;
            }
        }

        bag
    }
}

/// Unescape a tag value from wire format.
///
/// The escape sequences are `\:` → `;`, `\s` → space, `\\` → `\`,
/// `\r` → CR, `\n` → LF; an unknown escape drops the backslash and a
/// trailing backslash is dropped entirely.
pub fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => break,
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}
