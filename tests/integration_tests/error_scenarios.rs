//! Error scenario integration tests
//!
//! Tests various failure modes and error handling:
//! 1. Unrecognized day and time input
//! 2. Upstream failures during queries and refreshes
//! 3. End-to-end behavior against a mock schedule API with on-disk state

use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use freerooms::catalog::RoomsCatalog;
use freerooms::error::{Error, ErrorCategory, FreeRoomsErrorTrait, MapperError, UpstreamError};
use freerooms::service::{QueryOptions, RoomFinder};
use freerooms::upstream::UpstreamClient;

use super::fixtures::{harness, monday, room_names, test_config};
use crate::common::{entry, groups, schedule_json, FakeSource};

// ============================================================================
// Input Error Tests
// ============================================================================

#[tokio::test]
async fn test_unrecognized_input() {
    let h = harness(FakeSource::new(), &test_config(40), None, None);
    let options = QueryOptions::default();

    let err = h
        .finder
        .query_on(monday(), "someday", "10:30", 0, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Mapper(MapperError::InvalidDay(_))));
    assert_eq!(err.category(), ErrorCategory::Input);

    let err = h
        .finder
        .query_on(monday(), "today", "noon", 0, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Mapper(MapperError::InvalidTime(_))));

    // Before the first bell
    let err = h
        .finder
        .query_on(monday(), "today", "08:15", 0, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Mapper(MapperError::NoPairAtTime(_))));

    let err = h
        .finder
        .query_on(monday(), "today", "9", 0, &options)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Mapper(MapperError::PairOutOfRange { requested: 9, max: 8 })
    ));
}

// ============================================================================
// Upstream Failure Tests
// ============================================================================

#[tokio::test]
async fn test_query_with_failing_groups_is_degraded() {
    let source = FakeSource::new()
        .with_schedule("G1", vec![entry("G1", 0, 1, "101")])
        .with_failure("G2", UpstreamError::HttpStatus(502));
    let catalog = RoomsCatalog::from_names(["101", "102"]);
    let h = harness(source, &test_config(40), Some(groups(&["G1", "G2"])), Some(catalog));
    h.finder.load_state().await.unwrap();

    let response = h
        .finder
        .query_on(monday(), "today", "1", 0, &QueryOptions::default())
        .await
        .unwrap();

    assert!(response.is_degraded());
    assert!(!response.fully_degraded());
    assert_eq!(response.availability.failures[0].group, "G2");
    assert_eq!(room_names(&response.page.items), vec!["102"]);
}

#[tokio::test]
async fn test_refresh_groups_error_keeps_roster() {
    let source = FakeSource::new();
    source.set_groups(Err(UpstreamError::HttpStatus(500)));
    let h = harness(source, &test_config(40), Some(groups(&["G1"])), None);
    h.finder.load_state().await.unwrap();

    let err = h.finder.refresh_groups().await.unwrap_err();
    assert!(matches!(err, Error::Upstream(UpstreamError::HttpStatus(500))));
    assert!(err.is_recoverable());
    assert_eq!(*h.finder.groups().await, groups(&["G1"]));
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = test_config(40);
    config.calendar.page_size = 0;

    let result = RoomFinder::with_stores(
        Arc::new(FakeSource::new()),
        &config,
        Box::new(freerooms::storage::MemoryStore::new()),
        Box::new(freerooms::storage::MemoryStore::new()),
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

// ============================================================================
// End-to-end Tests
// ============================================================================

async fn mount_upstream(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/schedule/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"["G1", "G2"]"#))
        .mount(mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/schedule/data"))
        .and(body_string_contains("group=G1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(schedule_json(&[(1, 1, "3104"), (2, 3, "4113")])),
        )
        .mount(mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/schedule/data"))
        .and(body_string_contains("group=G2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(schedule_json(&[(1, 1, "1201")])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_end_to_end_with_persistence() {
    let mock_server = MockServer::start().await;
    mount_upstream(&mock_server).await;
    let temp_dir = TempDir::new().unwrap();

    let mut config = test_config(40);
    config.upstream.base_url = mock_server.uri();
    config.storage.data_dir = temp_dir.path().to_path_buf();

    let client = UpstreamClient::new(&config.upstream).unwrap();
    let finder = RoomFinder::new(Arc::new(client), &config).unwrap();
    finder.load_state().await.unwrap();

    let groups = finder.refresh_groups().await.unwrap();
    assert_eq!(groups.count, 2);
    let rooms = finder.refresh_rooms_catalog().await.unwrap();
    assert_eq!(rooms.count, 3);
    assert!(config.groups_path().exists());
    assert!(config.rooms_path().exists());

    // A fresh process picks up the saved state
    let client = UpstreamClient::new(&config.upstream).unwrap();
    let restarted = RoomFinder::new(Arc::new(client), &config).unwrap();
    let state = restarted.load_state().await.unwrap();
    assert_eq!(state.groups, 2);
    assert_eq!(state.rooms, 3);

    let response = restarted
        .query_on(monday(), "monday", "09:30", 0, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(room_names(&response.page.items), vec!["4113"]);
    assert_eq!(
        room_names(&response.availability.occupied),
        vec!["1201", "3104"]
    );
    assert!(!response.is_degraded());
}

#[tokio::test]
async fn test_end_to_end_upstream_down() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("groups.json"), r#"["G1", "G2"]"#).unwrap();
    std::fs::write(temp_dir.path().join("rooms.json"), r#"["3104", "4113"]"#).unwrap();

    let mut config = test_config(40);
    config.upstream.base_url = mock_server.uri();
    config.storage.data_dir = temp_dir.path().to_path_buf();

    let client = UpstreamClient::new(&config.upstream).unwrap();
    let finder = RoomFinder::new(Arc::new(client), &config).unwrap();
    let state = finder.load_state().await.unwrap();
    assert_eq!(state.groups, 2);
    assert_eq!(state.rooms, 2);

    let response = finder
        .query_on(monday(), "today", "1", 0, &QueryOptions::default())
        .await
        .unwrap();
    assert!(response.fully_degraded());
    assert_eq!(room_names(&response.page.items), vec!["3104", "4113"]);
}
