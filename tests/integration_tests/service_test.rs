//! Room finder service tests
//!
//! Covers:
//! 1. Day and slot resolution feeding the aggregation
//! 2. Stable paging of free rooms
//! 3. Prefix filtering
//! 4. Roster and catalog refresh with persistence

use freerooms::catalog::RoomsCatalog;
use freerooms::service::QueryOptions;
use freerooms::storage::Collection;

use super::fixtures::{harness, monday, room_names, test_config, wednesday};
use crate::common::{entry, groups, FakeSource};

fn two_groups_source() -> FakeSource {
    FakeSource::new()
        .with_schedule("G1", vec![entry("G1", 0, 2, "101"), entry("G1", 2, 1, "103")])
        .with_schedule("G2", vec![entry("G2", 0, 2, "102")])
}

fn six_rooms() -> RoomsCatalog {
    RoomsCatalog::from_names(["101", "102", "103", "104", "105", "106"])
}

#[tokio::test]
async fn test_load_state_restores_stores() {
    let h = harness(
        two_groups_source(),
        &test_config(40),
        Some(groups(&["G1", "G2"])),
        Some(six_rooms()),
    );

    let state = h.finder.load_state().await.unwrap();
    assert_eq!(state.groups, 2);
    assert_eq!(state.rooms, 6);
    assert_eq!(h.finder.catalog().await.len(), 6);
}

#[tokio::test]
async fn test_query_pages_free_rooms() {
    let h = harness(
        two_groups_source(),
        &test_config(2),
        Some(groups(&["G1", "G2"])),
        Some(six_rooms()),
    );
    h.finder.load_state().await.unwrap();
    let options = QueryOptions::default();

    // 10:30 falls in the second pair
    let first = h
        .finder
        .query_on(monday(), "today", "10:30", 0, &options)
        .await
        .unwrap();
    assert_eq!(first.pair.index, 2);
    assert_eq!(first.day.day_index, 0);
    assert_eq!(room_names(&first.page.items), vec!["103", "104"]);
    assert!(first.page.has_next);
    assert!(!first.page.has_prev);
    assert_eq!(first.page.total_count, 4);
    assert_eq!(first.page.total_pages, 2);
    assert_eq!(room_names(&first.availability.occupied), vec!["101", "102"]);

    let second = h
        .finder
        .query_on(monday(), "today", "10:30", 1, &options)
        .await
        .unwrap();
    assert_eq!(room_names(&second.page.items), vec!["105", "106"]);
    assert!(!second.page.has_next);
    assert!(second.page.has_prev);

    let beyond = h
        .finder
        .query_on(monday(), "today", "10:30", 7, &options)
        .await
        .unwrap();
    assert!(beyond.page.items.is_empty());
    assert!(!beyond.page.has_next);

    // Schedules were fetched once and then served from cache
    assert_eq!(h.source.calls("G1"), 1);
    assert_eq!(h.source.calls("G2"), 1);
}

#[tokio::test]
async fn test_query_by_weekday_and_pair_number() {
    let h = harness(
        two_groups_source(),
        &test_config(40),
        Some(groups(&["G1", "G2"])),
        Some(six_rooms()),
    );
    h.finder.load_state().await.unwrap();

    // From a Wednesday, "monday" is the coming Monday
    let response = h
        .finder
        .query_on(wednesday(), "понедельник", "2 пара", 0, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(response.day.date.to_string(), "2026-10-19");
    assert_eq!(room_names(&response.page.items), vec!["103", "104", "105", "106"]);

    // "today" on a Wednesday, first pair: G1 sits in 103
    let response = h
        .finder
        .query_on(wednesday(), "today", "1", 0, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(
        room_names(&response.page.items),
        vec!["101", "102", "104", "105", "106"]
    );
}

#[tokio::test]
async fn test_query_with_prefix() {
    let source = FakeSource::new().with_schedule("G1", vec![entry("G1", 0, 1, "1201")]);
    let catalog = RoomsCatalog::from_names(["1201", "1202", "3104", "3105"]);
    let h = harness(source, &test_config(40), Some(groups(&["G1"])), Some(catalog));
    h.finder.load_state().await.unwrap();

    let response = h
        .finder
        .query_on(monday(), "today", "09:00", 0, &QueryOptions::with_prefix("12"))
        .await
        .unwrap();
    assert_eq!(response.prefix.as_deref(), Some("12"));
    assert_eq!(room_names(&response.page.items), vec!["1202"]);
    assert_eq!(response.page.total_count, 1);
    assert_eq!(response.availability.free.len(), 3);

    let everything = h
        .finder
        .query_on(monday(), "today", "09:00", 0, &QueryOptions::with_prefix("all"))
        .await
        .unwrap();
    assert_eq!(everything.prefix, None);
    assert_eq!(everything.page.total_count, 3);
}

#[tokio::test]
async fn test_query_builds_missing_catalog() {
    let h = harness(two_groups_source(), &test_config(40), Some(groups(&["G1", "G2"])), None);
    h.finder.load_state().await.unwrap();
    assert!(h.finder.catalog().await.is_empty());

    let response = h
        .finder
        .query_on(monday(), "today", "2", 0, &QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(h.finder.catalog().await.len(), 3);
    assert_eq!(room_names(&response.page.items), vec!["103"]);
    assert_eq!(h.rooms_store.load().unwrap().map(|c| c.len()), Some(3));
}

#[tokio::test]
async fn test_refresh_groups_replaces_and_persists() {
    let source = FakeSource::new().with_groups(groups(&["G2", "G1"]));
    let h = harness(source, &test_config(40), Some(groups(&["OLD"])), None);
    h.finder.load_state().await.unwrap();

    let outcome = h.finder.refresh_groups().await.unwrap();
    assert!(outcome.replaced);
    assert_eq!(outcome.count, 2);

    let stored = h.groups_store.load().unwrap().unwrap();
    assert_eq!(stored, groups(&["G2", "G1"]));
    assert_eq!(*h.finder.groups().await, stored);
}

#[tokio::test]
async fn test_refresh_groups_keeps_old_roster_on_empty() {
    let h = harness(FakeSource::new(), &test_config(40), Some(groups(&["G1"])), None);
    h.finder.load_state().await.unwrap();

    let outcome = h.finder.refresh_groups().await.unwrap();
    assert!(!outcome.replaced);
    assert_eq!(outcome.count, 1);
    assert_eq!(*h.finder.groups().await, groups(&["G1"]));
    assert_eq!(h.groups_store.load().unwrap(), Some(groups(&["G1"])));
}

#[tokio::test]
async fn test_refresh_rooms_fetches_roster_first() {
    let source = two_groups_source().with_groups(groups(&["G1", "G2"]));
    let h = harness(source, &test_config(40), None, None);

    let outcome = h.finder.refresh_rooms_catalog().await.unwrap();
    assert!(outcome.replaced);
    assert_eq!(outcome.count, 3);
    assert_eq!(outcome.fetched, 2);
    assert!(outcome.failures.is_empty());
    assert_eq!(h.source.group_calls(), 1);

    let stored = h.rooms_store.load().unwrap().unwrap();
    assert_eq!(
        room_names(&stored.to_vec()),
        vec!["101", "102", "103"]
    );
    assert_eq!(h.groups_store.load().unwrap().map(|g| g.len()), Some(2));
}

#[tokio::test]
async fn test_refresh_rooms_keeps_old_catalog_when_nothing_found() {
    let source = FakeSource::new();
    let h = harness(
        source,
        &test_config(40),
        Some(groups(&["G1", "G2"])),
        Some(six_rooms()),
    );
    h.finder.load_state().await.unwrap();

    let outcome = h.finder.refresh_rooms_catalog().await.unwrap();
    assert!(!outcome.replaced);
    assert_eq!(outcome.count, 6);
    assert_eq!(h.finder.catalog().await.len(), 6);
}

#[tokio::test]
async fn test_cold_start_query_bootstraps_roster_and_catalog() {
    let source = two_groups_source().with_groups(groups(&["G1", "G2"]));
    let h = harness(source, &test_config(40), None, None);
    let state = h.finder.load_state().await.unwrap();
    assert_eq!(state.groups, 0);
    assert_eq!(state.rooms, 0);

    let response = h
        .finder
        .query_on(monday(), "today", "2", 0, &QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(h.source.group_calls(), 1);
    assert_eq!(h.finder.groups().await.len(), 2);
    assert_eq!(h.finder.catalog().await.len(), 3);
    assert_eq!(response.availability.fetched, 2);
    assert!(!response.is_degraded());
    assert_eq!(room_names(&response.page.items), vec!["103"]);
    assert_eq!(room_names(&response.availability.occupied), vec!["101", "102"]);

    // State is in place, so later queries skip the bootstrap
    h.finder
        .query_on(monday(), "today", "1", 0, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(h.source.group_calls(), 1);
    assert_eq!(h.groups_store.load().unwrap().map(|g| g.len()), Some(2));
}

#[tokio::test]
async fn test_cold_start_without_roster_answers_empty() {
    let h = harness(two_groups_source(), &test_config(40), None, None);
    h.finder.load_state().await.unwrap();

    let response = h
        .finder
        .query_on(monday(), "today", "2", 0, &QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(h.source.group_calls(), 1);
    assert!(h.finder.catalog().await.is_empty());
    assert!(response.page.items.is_empty());
    assert_eq!(h.source.total_calls(), 0);
}
