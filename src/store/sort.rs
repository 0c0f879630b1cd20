//! View ordering.

use super::entry::Entry;

/// The attribute a view is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDimension {
    /// Arrival order (equivalently, first-seen date).
    Date,
    /// Code, lexically.
    Code,
    /// Submitter name, lexically and case-insensitively.
    Submitter,
    /// Restriction score (fully credentialed submitters first).
    Privilege,
    /// Submission count.
    TimesRequested,
}

/// Active sort: one dimension plus an independent direction bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    /// The active dimension.
    pub dimension: SortDimension,
    /// Present rows in the opposite direction.
    pub reversed: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            dimension: SortDimension::Date,
            reversed: false,
        }
    }
}

/// A captured, comparable sort key.
///
/// Keys in one view always come from the same dimension, so the
/// cross-variant ordering the derive produces is never exercised.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    /// Arrival position.
    Seq(u64),
    /// Lexical key.
    Text(String),
    /// Privilege restriction score.
    Score(u8),
    /// Submission count.
    Count(u32),
}

/// The sort key of an entry under a dimension.
///
/// Ties between equal keys always resolve by arrival order; that
/// tie-break lives in the insert/rebuild code, not the key itself.
pub fn key_of(entry: &Entry, dimension: SortDimension) -> SortValue {
    match dimension {
        SortDimension::Date => SortValue::Seq(entry.seq),
        SortDimension::Code => SortValue::Text(entry.code.clone()),
        SortDimension::Submitter => SortValue::Text(entry.submitter.to_lowercase()),
        SortDimension::Privilege => SortValue::Score(entry.flags.privilege_score()),
        SortDimension::TimesRequested => SortValue::Count(entry.times_requested),
    }
}

/// The display position at which a new key belongs.
///
/// Stable: a new key lands after existing equal keys, so equal-key rows
/// keep their arrival order. The view arrays are kept in display order,
/// so in reverse mode the ascending insertion point `i` maps to the
/// mirrored position `len - i` — which is exactly the number of stored
/// keys strictly greater than the new one.
pub fn insertion_point(keys: &[SortValue], key: &SortValue, reversed: bool) -> usize {
    if reversed {
        keys.partition_point(|k| k > key)
    } else {
        keys.partition_point(|k| k <= key)
    }
}
