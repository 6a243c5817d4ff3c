use std::sync::Arc;
use std::thread;

use steamcount_core::model::CountResult;
use steamcount_core::session_state::{SessionSnapshot, SessionState};

#[test]
fn toggling_twice_restores_membership() {
    let state = SessionState::default();

    assert!(state.toggle_favorite("Hollow Knight"));
    assert!(state.is_favorite("Hollow Knight"));
    assert!(!state.toggle_favorite("Hollow Knight"));
    assert!(!state.is_favorite("Hollow Knight"));

    state.toggle_favorite("Dota 2");
    state.toggle_favorite("Dota 2");
    state.toggle_favorite("Dota 2");
    assert!(state.is_favorite("Dota 2"));
}

#[test]
fn favorites_are_listed_sorted() {
    let state = SessionState::default();
    for name in ["Terraria", "Apex Legends", "Dota 2"] {
        state.toggle_favorite(name);
    }
    assert_eq!(state.favorites_sorted(), vec!["Apex Legends", "Dota 2", "Terraria"]);
}

#[test]
fn history_keeps_most_recent_twenty_in_order() {
    let state = SessionState::new(20, 10);
    for i in 0..21 {
        assert!(state.record_search(&format!("Game {i}")));
    }

    let history = state.history();
    assert_eq!(history.len(), 20);
    assert_eq!(history.first().map(String::as_str), Some("Game 1"));
    assert_eq!(history.last().map(String::as_str), Some("Game 20"));
}

#[test]
fn repeated_search_does_not_move_or_grow_history() {
    let state = SessionState::default();
    state.record_search("Portal");
    state.record_search("Dota 2");

    assert!(!state.record_search("Portal"));
    assert_eq!(state.history(), vec!["Portal", "Dota 2"]);
}

#[test]
fn snapshot_round_trips_through_restore() {
    let state = SessionState::default();
    state.toggle_favorite("Terraria");
    state.record_search("Terraria");
    state.set_refresh_interval(30).unwrap();

    let snapshot = state.snapshot();
    let restored = SessionState::default();
    restored.restore(snapshot.clone()).unwrap();

    assert_eq!(restored.snapshot(), snapshot);
    assert_eq!(restored.refresh_config().interval_secs, 30);
}

#[test]
fn invalid_restore_changes_nothing() {
    let state = SessionState::default();
    state.toggle_favorite("Terraria");
    state.record_search("Terraria");
    let before = state.snapshot();

    let result = state.restore(SessionSnapshot {
        favorites: vec!["Other".to_string()],
        history: vec!["Other".to_string()],
        refresh_interval_secs: 10_000_000,
    });

    assert!(result.is_err());
    assert_eq!(state.snapshot(), before);
}

#[test]
fn restore_dedups_and_bounds_history() {
    let state = SessionState::new(3, 2);
    state
        .restore(SessionSnapshot {
            favorites: vec!["B".into(), " ".into(), "A".into(), "B".into()],
            history: vec!["a", "b", "a", "c", "d"].into_iter().map(String::from).collect(),
            refresh_interval_secs: 0,
        })
        .unwrap();

    assert_eq!(state.favorites_sorted(), vec!["A", "B"]);
    assert_eq!(state.history(), vec!["b", "c", "d"]);
    assert_eq!(state.recent_history(), vec!["d", "c"]);
}

#[test]
fn refresh_results_for_removed_favorites_are_dropped() {
    let state = SessionState::default();
    let result = CountResult {
        entry_id: 105600,
        count: Some(12_000),
        fetched_at_epoch_secs: 1,
    };

    state.toggle_favorite("Terraria");
    assert!(state.record_favorite_count("Terraria", result));
    state.toggle_favorite("Terraria");

    assert!(!state.record_favorite_count("Terraria", result));
    assert!(state.favorite_counts().is_empty());
}

#[test]
fn concurrent_mutations_keep_history_bounded_and_unique() {
    let state = Arc::new(SessionState::new(20, 10));
    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for i in 0..50 {
                    state.record_search(&format!("Game {}", (worker * 7 + i) % 30));
                    state.toggle_favorite(&format!("Fav {}", i % 5));
                    let _ = state.snapshot();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let history = state.history();
    assert!(history.len() <= 20);
    let mut unique = history.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), history.len());
}
