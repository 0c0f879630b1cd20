//! The aggregate code store.
//!
//! One [`Store`] owns every code discovered during a session: an
//! authoritative `code → Entry` map plus a display-ordered view of the
//! entries admitted by the active filter, kept sorted under the active
//! dimension. Ingestion inserts into the sorted view incrementally
//! (binary search on a parallel key array) instead of re-sorting; filter
//! and sort changes rebuild the view wholesale.
//!
//! All state sits behind one mutex. Ingestion and presentation touch the
//! store from different tasks, and a single coarse lock per operation
//! makes every reader snapshot consistent without any ordering rules
//! between locks. Change notifications go out on a broadcast channel,
//! emitted while the lock is held so receivers observe them in mutation
//! order.

mod entry;
mod filter;
mod sort;

pub use entry::{Entry, EntryFlags};
pub use filter::{FilterKind, FilterSet};
pub use sort::{SortDimension, SortSpec, SortValue};

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;
use twirc_proto::TagBag;

use sort::{insertion_point, key_of};

/// Highlight color for entries marked fake.
pub const MARKED_FAKE_HIGHLIGHT: &str = "#e05252";

/// Highlight color for entries whose code shape is suspicious.
pub const POTENTIALLY_FAKE_HIGHLIGHT: &str = "#e0a030";

/// A change to the visible view.
///
/// Row numbers are display positions valid at emission time. `Reset`
/// means everything changed; receivers re-read the whole view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Rows `start..=end` appeared.
    RowsInserted {
        /// First affected row.
        start: usize,
        /// Last affected row.
        end: usize,
    },
    /// The entry at `row` changed in place.
    RowUpdated {
        /// Affected row.
        row: usize,
    },
    /// Rows `start..=end` disappeared.
    RowsRemoved {
        /// First removed row.
        start: usize,
        /// Last removed row.
        end: usize,
    },
    /// The whole view was rebuilt or cleared.
    Reset,
}

/// Store behavior knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Re-derive an entry's flags (and replace its stored tags) when its
    /// code is submitted again. Off by default: the historical behavior
    /// keeps the flags from the first sighting, even if the submitter has
    /// since gained a subscription or privilege.
    pub recompute_flags: bool,
}

/// A copy of one visible row, taken under the store lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSnapshot {
    /// Canonical code.
    pub code: String,
    /// Most recent submitter.
    pub submitter: String,
    /// Submitter-credential summary.
    pub privilege: &'static str,
    /// Submission count.
    pub times_requested: u32,
    /// First-seen time as epoch seconds.
    pub date_ordinal: i64,
    /// Classification flags.
    pub flags: EntryFlags,
}

impl RowSnapshot {
    fn of(entry: &Entry) -> RowSnapshot {
        RowSnapshot {
            code: entry.code.clone(),
            submitter: entry.submitter.clone(),
            privilege: entry.privilege_summary(),
            times_requested: entry.times_requested,
            date_ordinal: entry.first_seen.timestamp(),
            flags: entry.flags,
        }
    }

    /// Highlight color for this row, if any. Marked-fake wins over
    /// potentially-fake.
    pub fn highlight(&self) -> Option<&'static str> {
        if self.flags.marked_fake {
            Some(MARKED_FAKE_HIGHLIGHT)
        } else if self.flags.potentially_fake {
            Some(POTENTIALLY_FAKE_HIGHLIGHT)
        } else {
            None
        }
    }
}

struct Inner {
    by_code: HashMap<String, Entry>,
    /// Codes in display order.
    view: Vec<String>,
    /// Sort keys parallel to `view`, captured at insert/rebuild time.
    keys: Vec<SortValue>,
    filter: FilterSet,
    sort: SortSpec,
    next_seq: u64,
}

impl Inner {
    fn rebuild(&mut self) {
        let mut rows: Vec<(String, SortValue, u64)> = self
            .by_code
            .values()
            .filter(|e| self.filter.admits(&e.flags))
            .map(|e| (e.code.clone(), key_of(e, self.sort.dimension), e.seq))
            .collect();
        rows.sort_by(|a, b| a.1.cmp(&b.1).then(a.2.cmp(&b.2)));
        if self.sort.reversed {
            rows.reverse();
        }
        self.keys = rows.iter().map(|(_, key, _)| key.clone()).collect();
        self.view = rows.into_iter().map(|(code, _, _)| code).collect();
    }
}

/// The deduplicating, filterable, sortable code collection.
pub struct Store {
    inner: Mutex<Inner>,
    events: broadcast::Sender<StoreEvent>,
    options: StoreOptions,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create an empty store with default options.
    pub fn new() -> Store {
        Store::with_options(StoreOptions::default())
    }

    /// Create an empty store.
    pub fn with_options(options: StoreOptions) -> Store {
        let (events, _) = broadcast::channel(256);
        Store {
            inner: Mutex::new(Inner {
                by_code: HashMap::new(),
                view: Vec::new(),
                keys: Vec::new(),
                filter: FilterSet::default(),
                sort: SortSpec::default(),
                next_seq: 0,
            }),
            events,
            options,
        }
    }

    /// Subscribe to view change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is fine; the store works headless.
        let _ = self.events.send(event);
    }

    /// Record a submission of `code` by `name`.
    ///
    /// A first sighting creates an entry and, when the filter admits it,
    /// inserts it into the view at its sorted position. A repeat sighting
    /// bumps the counter and the submitter name in place.
    pub fn add_entry(&self, code: &str, name: &str, tags: Option<TagBag>) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some(entry) = inner.by_code.get_mut(code) {
            entry.times_requested += 1;
            entry.submitter = preferred_name(name, tags.as_ref());
            if self.options.recompute_flags {
                entry.flags = EntryFlags::derive(code, tags.as_ref());
                entry.tags = tags;
            }
            debug!(code, times = entry.times_requested, "repeat submission");

            let admitted = inner.filter.admits(&entry.flags);
            let key = key_of(entry, inner.sort.dimension);
            let row = inner.view.iter().position(|c| c == code);
            match (admitted, row) {
                (true, Some(row)) => self.emit(StoreEvent::RowUpdated { row }),
                (true, None) => {
                    // Repair path: the entry passes the filter but is
                    // missing from the view.
                    let row = insertion_point(&inner.keys, &key, inner.sort.reversed);
                    inner.view.insert(row, code.to_owned());
                    inner.keys.insert(row, key);
                    self.emit(StoreEvent::RowsInserted {
                        start: row,
                        end: row,
                    });
                }
                (false, Some(row)) => {
                    // Only reachable when recomputed flags stopped passing
                    // the filter.
                    inner.view.remove(row);
                    inner.keys.remove(row);
                    self.emit(StoreEvent::RowsRemoved {
                        start: row,
                        end: row,
                    });
                }
                (false, None) => {}
            }
            return;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let flags = EntryFlags::derive(code, tags.as_ref());
        let entry = Entry {
            code: code.to_owned(),
            submitter: preferred_name(name, tags.as_ref()),
            tags,
            first_seen: Utc::now(),
            times_requested: 1,
            flags,
            seq,
        };
        debug!(code, submitter = %entry.submitter, "new code recorded");

        if inner.filter.admits(&flags) {
            let key = key_of(&entry, inner.sort.dimension);
            let row = insertion_point(&inner.keys, &key, inner.sort.reversed);
            inner.view.insert(row, entry.code.clone());
            inner.keys.insert(row, key);
            self.emit(StoreEvent::RowsInserted {
                start: row,
                end: row,
            });
        }
        inner.by_code.insert(entry.code.clone(), entry);
    }

    /// Remove the rows at the given view positions, deleting their
    /// entries entirely.
    ///
    /// Positions are relative to the view as it was before this call;
    /// duplicates are collapsed.
    ///
    /// # Panics
    ///
    /// Panics if any position is out of range. Passing a stale index is a
    /// caller bug and should fail loudly rather than delete the wrong row.
    pub fn remove_at(&self, rows: &[usize]) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let mut sorted = rows.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if let Some(&max) = sorted.last() {
            assert!(
                max < inner.view.len(),
                "row {max} out of range for a view of {} rows",
                inner.view.len()
            );
        }

        // Each earlier removal shifts later positions down by one.
        for (removed, row) in sorted.into_iter().enumerate() {
            let row = row - removed;
            let code = inner.view.remove(row);
            inner.keys.remove(row);
            inner.by_code.remove(&code);
            debug!(code = %code, "entry removed");
            self.emit(StoreEvent::RowsRemoved {
                start: row,
                end: row,
            });
        }
    }

    /// Toggle one filter predicate. A no-op when the predicate already has
    /// the requested state; otherwise the view is rebuilt from scratch.
    pub fn set_filter(&self, kind: FilterKind, enabled: bool) {
        let mut inner = self.inner.lock();
        if inner.filter.get(kind) == enabled {
            return;
        }
        inner.filter.set(kind, enabled);
        inner.rebuild();
        self.emit(StoreEvent::Reset);
    }

    /// Change the active sort. Always rebuilds the view.
    pub fn set_sort(&self, dimension: SortDimension, reversed: bool) {
        let mut inner = self.inner.lock();
        inner.sort = SortSpec {
            dimension,
            reversed,
        };
        inner.rebuild();
        self.emit(StoreEvent::Reset);
    }

    /// Drop every entry.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.by_code.clear();
        inner.view.clear();
        inner.keys.clear();
        self.emit(StoreEvent::Reset);
    }

    /// Number of visible rows.
    pub fn len(&self) -> usize {
        self.inner.lock().view.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().view.is_empty()
    }

    /// Total number of stored entries, visible or not.
    pub fn total(&self) -> usize {
        self.inner.lock().by_code.len()
    }

    /// Snapshot of one visible row.
    pub fn row(&self, index: usize) -> Option<RowSnapshot> {
        let inner = self.inner.lock();
        let code = inner.view.get(index)?;
        inner.by_code.get(code).map(RowSnapshot::of)
    }

    /// Consistent snapshot of the whole view, in display order.
    pub fn rows(&self) -> Vec<RowSnapshot> {
        let inner = self.inner.lock();
        inner
            .view
            .iter()
            .filter_map(|code| inner.by_code.get(code))
            .map(RowSnapshot::of)
            .collect()
    }

    /// The active filter set.
    pub fn filter(&self) -> FilterSet {
        self.inner.lock().filter
    }

    /// The active sort.
    pub fn sort(&self) -> SortSpec {
        self.inner.lock().sort
    }
}

fn preferred_name(name: &str, tags: Option<&TagBag>) -> String {
    match tags {
        Some(t) if !t.display_name.is_empty() => t.display_name.clone(),
        _ => name.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use twirc_proto::UserType;

    fn tags(subscriber: bool, user_type: UserType, display_name: &str) -> TagBag {
        TagBag {
            subscriber,
            turbo: false,
            user_type,
            display_name: display_name.to_owned(),
        }
    }

    #[test]
    fn test_dedup_counts_submissions() {
        let store = Store::new();
        for _ in 0..5 {
            store.add_entry("1234-0000-89AB-CDEF", "somefan", None);
        }
        assert_eq!(store.total(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.row(0).unwrap().times_requested, 5);
    }

    #[test]
    fn test_resubmission_overwrites_submitter() {
        let store = Store::new();
        store.add_entry("1234-0000-89AB-CDEF", "firstfan", None);
        store.add_entry(
            "1234-0000-89AB-CDEF",
            "secondfan",
            Some(tags(false, UserType::Empty, "SecondFan")),
        );
        assert_eq!(store.row(0).unwrap().submitter, "SecondFan");
    }

    #[test]
    fn test_display_name_preferred_over_sender() {
        let store = Store::new();
        store.add_entry(
            "1234-0000-89AB-CDEF",
            "somefan",
            Some(tags(true, UserType::Empty, "SomeFan")),
        );
        assert_eq!(store.row(0).unwrap().submitter, "SomeFan");

        let store = Store::new();
        store.add_entry("1234-0000-89AB-CDEF", "somefan", Some(tags(true, UserType::Empty, "")));
        assert_eq!(store.row(0).unwrap().submitter, "somefan");
    }

    #[test]
    fn test_code_sort_inserts_in_position() {
        let store = Store::new();
        store.set_sort(SortDimension::Code, false);
        store.add_entry("2222-0000-0000-0000", "a", None);
        store.add_entry("1111-0000-0000-0000", "b", None);
        store.add_entry("3333-0000-0000-0000", "c", None);

        let codes: Vec<String> = store.rows().into_iter().map(|r| r.code).collect();
        assert_eq!(
            codes,
            vec![
                "1111-0000-0000-0000",
                "2222-0000-0000-0000",
                "3333-0000-0000-0000"
            ]
        );
    }

    #[test]
    fn test_reversed_sort_inserts_mirrored() {
        let store = Store::new();
        store.set_sort(SortDimension::Code, true);
        store.add_entry("2222-0000-0000-0000", "a", None);
        store.add_entry("1111-0000-0000-0000", "b", None);
        store.add_entry("3333-0000-0000-0000", "c", None);

        let codes: Vec<String> = store.rows().into_iter().map(|r| r.code).collect();
        assert_eq!(
            codes,
            vec![
                "3333-0000-0000-0000",
                "2222-0000-0000-0000",
                "1111-0000-0000-0000"
            ]
        );
    }

    #[test]
    fn test_equal_keys_keep_arrival_order() {
        let store = Store::new();
        store.set_sort(SortDimension::Privilege, false);
        // All three have the same privilege score.
        store.add_entry("1111-0000-0000-0000", "a", None);
        store.add_entry("2222-0000-0000-0000", "b", None);
        store.add_entry("3333-0000-0000-0000", "c", None);

        let codes: Vec<String> = store.rows().into_iter().map(|r| r.code).collect();
        assert_eq!(
            codes,
            vec![
                "1111-0000-0000-0000",
                "2222-0000-0000-0000",
                "3333-0000-0000-0000"
            ]
        );
    }

    #[test]
    fn test_filtered_add_is_stored_but_hidden() {
        let store = Store::new();
        store.set_filter(FilterKind::RequireSubscriber, true);
        store.add_entry("1234-0000-89AB-CDEF", "somefan", None);
        assert_eq!(store.len(), 0);
        assert_eq!(store.total(), 1);
    }

    #[test]
    fn test_update_notification_carries_row() {
        let store = Store::new();
        let mut events = store.subscribe();
        store.add_entry("1234-0000-89AB-CDEF", "somefan", None);
        store.add_entry("1234-0000-89AB-CDEF", "somefan", None);

        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::RowsInserted { start: 0, end: 0 }
        );
        assert_eq!(events.try_recv().unwrap(), StoreEvent::RowUpdated { row: 0 });
    }

    #[test]
    fn test_flags_are_not_recomputed_by_default() {
        let store = Store::new();
        store.add_entry("1234-0000-89AB-CDEF", "somefan", None);
        store.add_entry(
            "1234-0000-89AB-CDEF",
            "somefan",
            Some(tags(true, UserType::Mod, "SomeFan")),
        );
        let row = store.row(0).unwrap();
        assert!(row.flags.non_subscriber);
        assert!(row.flags.marked_fake);
    }

    #[test]
    fn test_recompute_option_rederives_flags() {
        let store = Store::with_options(StoreOptions {
            recompute_flags: true,
        });
        store.add_entry("1234-0000-89AB-CDEF", "somefan", None);
        store.add_entry(
            "1234-0000-89AB-CDEF",
            "somefan",
            Some(tags(true, UserType::Mod, "SomeFan")),
        );
        let row = store.row(0).unwrap();
        assert!(!row.flags.non_subscriber);
        assert!(!row.flags.marked_fake);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_remove_out_of_range_panics() {
        let store = Store::new();
        store.add_entry("1234-0000-89AB-CDEF", "somefan", None);
        store.remove_at(&[3]);
    }

    #[test]
    fn test_reset_empties_everything() {
        let store = Store::new();
        store.add_entry("1234-0000-89AB-CDEF", "somefan", None);
        store.reset();
        assert_eq!(store.len(), 0);
        assert_eq!(store.total(), 0);
    }

    #[test]
    fn test_highlight_prefers_marked_fake() {
        let store = Store::new();
        // No tags: marked fake. Second group nonzero: potentially fake.
        store.add_entry("1234-5678-89AB-CDEF", "somefan", None);
        let row = store.row(0).unwrap();
        assert!(row.flags.marked_fake && row.flags.potentially_fake);
        assert_eq!(row.highlight(), Some(MARKED_FAKE_HIGHLIGHT));
    }
}
