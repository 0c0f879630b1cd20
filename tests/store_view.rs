//! Integration tests for store view maintenance.
//!
//! Exercises whole sequences of mutations and checks the view always
//! matches what filtering and sorting the entries from scratch would give.

use levelbot::store::{FilterKind, SortDimension, Store, StoreEvent};
use twirc_proto::{TagBag, UserType};

fn sub_tags(display_name: &str) -> TagBag {
    TagBag {
        subscriber: true,
        turbo: false,
        user_type: UserType::Empty,
        display_name: display_name.to_owned(),
    }
}

fn mod_tags(display_name: &str) -> TagBag {
    TagBag {
        subscriber: true,
        turbo: false,
        user_type: UserType::Mod,
        display_name: display_name.to_owned(),
    }
}

fn codes(store: &Store) -> Vec<String> {
    store.rows().into_iter().map(|r| r.code).collect()
}

#[test]
fn test_view_matches_rederivation_across_mutations() {
    let store = Store::new();

    store.add_entry("3333-0000-0000-0000", "cara", Some(sub_tags("Cara")));
    store.add_entry("1111-0000-0000-0000", "andy", None);
    store.add_entry("2222-0000-0000-0000", "beth", Some(mod_tags("Beth")));
    store.add_entry("1111-0000-0000-0000", "dave", None);

    // Default sort is arrival order.
    assert_eq!(
        codes(&store),
        vec![
            "3333-0000-0000-0000",
            "1111-0000-0000-0000",
            "2222-0000-0000-0000"
        ]
    );

    store.set_sort(SortDimension::Code, false);
    assert_eq!(
        codes(&store),
        vec![
            "1111-0000-0000-0000",
            "2222-0000-0000-0000",
            "3333-0000-0000-0000"
        ]
    );

    // New entries land at their sorted position, not at the end.
    store.add_entry("2500-0000-0000-0000", "elsa", Some(sub_tags("Elsa")));
    assert_eq!(
        codes(&store),
        vec![
            "1111-0000-0000-0000",
            "2222-0000-0000-0000",
            "2500-0000-0000-0000",
            "3333-0000-0000-0000"
        ]
    );

    // Hiding non-subscribers drops andy's entry only.
    store.set_filter(FilterKind::RequireSubscriber, true);
    assert_eq!(
        codes(&store),
        vec![
            "2222-0000-0000-0000",
            "2500-0000-0000-0000",
            "3333-0000-0000-0000"
        ]
    );

    // Dropping the filter restores the hidden entry at its sorted position.
    store.set_filter(FilterKind::RequireSubscriber, false);
    assert_eq!(
        codes(&store),
        vec![
            "1111-0000-0000-0000",
            "2222-0000-0000-0000",
            "2500-0000-0000-0000",
            "3333-0000-0000-0000"
        ]
    );
}

#[test]
fn test_removal_batch_uses_pre_removal_indexes() {
    let store = Store::new();
    for code in [
        "1111-0000-0000-0000",
        "2222-0000-0000-0000",
        "3333-0000-0000-0000",
        "4444-0000-0000-0000",
        "5555-0000-0000-0000",
    ] {
        store.add_entry(code, "somefan", None);
    }

    // Indexes are relative to the view before any removal in the batch.
    store.remove_at(&[1, 3]);

    assert_eq!(
        codes(&store),
        vec![
            "1111-0000-0000-0000",
            "3333-0000-0000-0000",
            "5555-0000-0000-0000"
        ]
    );
    assert_eq!(store.total(), 3);
}

#[test]
fn test_removal_order_does_not_matter() {
    let build = || {
        let store = Store::new();
        for code in [
            "1111-0000-0000-0000",
            "2222-0000-0000-0000",
            "3333-0000-0000-0000",
            "4444-0000-0000-0000",
        ] {
            store.add_entry(code, "somefan", None);
        }
        store
    };

    let a = build();
    a.remove_at(&[0, 2]);
    let b = build();
    b.remove_at(&[2, 0]);
    assert_eq!(codes(&a), codes(&b));
}

#[test]
fn test_removed_entries_are_gone_for_good() {
    let store = Store::new();
    store.add_entry("1111-0000-0000-0000", "somefan", None);
    store.remove_at(&[0]);
    assert_eq!(store.total(), 0);

    // Resubmission starts a fresh entry.
    store.add_entry("1111-0000-0000-0000", "somefan", None);
    assert_eq!(store.row(0).unwrap().times_requested, 1);
}

#[test]
fn test_filter_toggle_emits_reset_and_noop_does_not() {
    let store = Store::new();
    let mut events = store.subscribe();

    store.set_filter(FilterKind::ExcludeFake, true);
    assert_eq!(events.try_recv().unwrap(), StoreEvent::Reset);

    // Same state again: no rebuild, no notification.
    store.set_filter(FilterKind::ExcludeFake, true);
    assert!(events.try_recv().is_err());

    store.set_sort(SortDimension::Code, true);
    assert_eq!(events.try_recv().unwrap(), StoreEvent::Reset);
}

#[test]
fn test_reversed_rebuild_and_incremental_insert_agree() {
    // Insert codes incrementally under a reversed sort, then force a full
    // rebuild of the same state; the two orders must match.
    let incremental = Store::new();
    incremental.set_sort(SortDimension::Code, true);

    let rebuilt = Store::new();

    for (code, name) in [
        ("2222-0000-0000-0000", "a"),
        ("4444-0000-0000-0000", "b"),
        ("1111-0000-0000-0000", "c"),
        ("3333-0000-0000-0000", "d"),
    ] {
        incremental.add_entry(code, name, None);
        rebuilt.add_entry(code, name, None);
    }
    rebuilt.set_sort(SortDimension::Code, true);

    assert_eq!(codes(&incremental), codes(&rebuilt));
    assert_eq!(
        codes(&incremental),
        vec![
            "4444-0000-0000-0000",
            "3333-0000-0000-0000",
            "2222-0000-0000-0000",
            "1111-0000-0000-0000"
        ]
    );
}

#[test]
fn test_equal_key_stability_survives_rebuild() {
    let store = Store::new();
    // Same privilege score for everyone: view must stay in arrival order
    // both incrementally and after a rebuild of the same sort.
    for code in [
        "3333-0000-0000-0000",
        "1111-0000-0000-0000",
        "2222-0000-0000-0000",
    ] {
        store.add_entry(code, "somefan", None);
    }
    store.set_sort(SortDimension::Privilege, false);

    assert_eq!(
        codes(&store),
        vec![
            "3333-0000-0000-0000",
            "1111-0000-0000-0000",
            "2222-0000-0000-0000"
        ]
    );
}

#[test]
fn test_hidden_duplicate_submissions_still_count() {
    let store = Store::new();
    store.set_filter(FilterKind::RequireModerator, true);

    store.add_entry("1111-0000-0000-0000", "somefan", None);
    store.add_entry("1111-0000-0000-0000", "somefan", None);
    assert_eq!(store.len(), 0);

    store.set_filter(FilterKind::RequireModerator, false);
    assert_eq!(store.len(), 1);
    assert_eq!(store.row(0).unwrap().times_requested, 2);
}

#[test]
fn test_times_requested_sort_orders_by_popularity() {
    let store = Store::new();
    store.add_entry("1111-0000-0000-0000", "a", None);
    for _ in 0..3 {
        store.add_entry("2222-0000-0000-0000", "b", None);
    }
    for _ in 0..2 {
        store.add_entry("3333-0000-0000-0000", "c", None);
    }

    store.set_sort(SortDimension::TimesRequested, true);
    assert_eq!(
        codes(&store),
        vec![
            "2222-0000-0000-0000",
            "3333-0000-0000-0000",
            "1111-0000-0000-0000"
        ]
    );
}
