//! View filtering.

use super::entry::EntryFlags;

/// One toggleable exclusion predicate.
///
/// The "require" predicates are modeled as excluding the complement flag:
/// `RequireSubscriber` hides entries whose `non_subscriber` flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Hide entries marked fake.
    ExcludeFake,
    /// Hide entries whose code shape is suspicious.
    ExcludePotentiallyFake,
    /// Hide entries submitted by non-subscribers.
    RequireSubscriber,
    /// Hide entries submitted without any privilege.
    RequireModerator,
}

/// The set of active exclusion predicates.
///
/// With no bits set, every entry is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterSet {
    exclude_fake: bool,
    exclude_potentially_fake: bool,
    require_subscriber: bool,
    require_moderator: bool,
}

impl FilterSet {
    /// Whether the given predicate is active.
    pub fn get(&self, kind: FilterKind) -> bool {
        match kind {
            FilterKind::ExcludeFake => self.exclude_fake,
            FilterKind::ExcludePotentiallyFake => self.exclude_potentially_fake,
            FilterKind::RequireSubscriber => self.require_subscriber,
            FilterKind::RequireModerator => self.require_moderator,
        }
    }

    /// Toggle one predicate.
    pub fn set(&mut self, kind: FilterKind, enabled: bool) {
        match kind {
            FilterKind::ExcludeFake => self.exclude_fake = enabled,
            FilterKind::ExcludePotentiallyFake => self.exclude_potentially_fake = enabled,
            FilterKind::RequireSubscriber => self.require_subscriber = enabled,
            FilterKind::RequireModerator => self.require_moderator = enabled,
        }
    }

    /// Whether an entry with these flags is visible under the active set.
    pub fn admits(&self, flags: &EntryFlags) -> bool {
        !(self.exclude_fake && flags.marked_fake)
            && !(self.exclude_potentially_fake && flags.potentially_fake)
            && !(self.require_subscriber && flags.non_subscriber)
            && !(self.require_moderator && flags.non_moderator)
    }
}
