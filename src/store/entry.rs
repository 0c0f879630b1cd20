//! Entry records and flag derivation.

use chrono::{DateTime, Utc};
use twirc_proto::{TagBag, UserType};

/// Classification flags for one entry.
///
/// Flags are a pure function of `(code, tags)` via [`EntryFlags::derive`];
/// there is no other flag state, so deriving twice for the same input
/// always yields the same result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryFlags {
    /// The code's shape makes it unlikely to be real (second group is not
    /// the literal `0000`).
    pub potentially_fake: bool,
    /// The submitter had neither a subscription nor any privilege.
    pub marked_fake: bool,
    /// The submitter was not a subscriber (or sent no tags at all).
    pub non_subscriber: bool,
    /// The submitter had no privilege level (or sent no tags at all).
    pub non_moderator: bool,
}

impl EntryFlags {
    /// Derive the flags for a canonical code and its submission tags.
    pub fn derive(code: &str, tags: Option<&TagBag>) -> EntryFlags {
        let potentially_fake = code.split('-').nth(1) != Some("0000");
        let non_subscriber = tags.is_none_or(|t| !t.subscriber);
        let non_moderator = tags.is_none_or(|t| t.user_type == UserType::Empty);
        EntryFlags {
            potentially_fake,
            marked_fake: non_subscriber && non_moderator,
            non_subscriber,
            non_moderator,
        }
    }

    /// Restriction score used by the privilege sort: one point per missing
    /// credential, so fully credentialed submitters score 0, the lowest.
    pub fn privilege_score(&self) -> u8 {
        u8::from(self.non_subscriber) + u8::from(self.non_moderator)
    }
}

/// One distinct code and its accumulated metadata.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Canonical code, the unique key.
    pub code: String,
    /// Display name of the most recent submitter.
    pub submitter: String,
    /// Tags from the submission that created the entry.
    pub tags: Option<TagBag>,
    /// When the code was first seen. Set once, never updated.
    pub first_seen: DateTime<Utc>,
    /// How many times the code has been submitted, starting at 1.
    pub times_requested: u32,
    /// Classification flags, computed at creation.
    pub flags: EntryFlags,
    /// Insertion counter; total-orders entries for tie-breaking.
    pub(crate) seq: u64,
}

impl Entry {
    /// Short submitter-credential summary for a presentation column.
    pub fn privilege_summary(&self) -> &'static str {
        match (!self.flags.non_subscriber, !self.flags.non_moderator) {
            (true, true) => "sub+mod",
            (true, false) => "sub",
            (false, true) => "mod",
            (false, false) => "viewer",
        }
    }
}
