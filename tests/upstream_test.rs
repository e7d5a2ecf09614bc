//! Integration tests for UpstreamClient using wiremock
//!
//! These tests validate the schedule and roster requests against mock servers.

mod common;

use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::schedule_json;
use freerooms::config::UpstreamConfig;
use freerooms::models::Group;
use freerooms::upstream::{ScheduleSource, UpstreamClient};
use freerooms::utils::error::UpstreamError;

const SCHEDULE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<body>
    <form>
        <select id="groupSelect" name="group">
            <option value="">Выберите группу</option>
            <option value="ПИН-21">ПИН-21</option>
            <option>ИВТ-32</option>
        </select>
        <select name="week"><option value="1">1 неделя</option></select>
    </form>
</body>
</html>"#;

fn client_for(server: &MockServer) -> UpstreamClient {
    let config = UpstreamConfig {
        base_url: server.uri(),
        request_timeout_secs: 2,
        ..Default::default()
    };
    UpstreamClient::new(&config).unwrap()
}

fn ids(groups: &[Group]) -> Vec<&str> {
    groups.iter().map(|g| g.id.as_str()).collect()
}

/// Test successful schedule fetch from mock server
#[tokio::test]
async fn test_fetch_schedule_posts_group_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/schedule/data"))
        .and(body_string_contains("group=PIN-21"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(schedule_json(&[(1, 2, "3104"), (3, 4, " 1201 ")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let entries = client.fetch_schedule(&Group::new("PIN-21")).await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].group, "PIN-21");
    assert_eq!(entries[0].day_index, 0);
    assert_eq!(entries[0].pair_index, 2);
    assert_eq!(entries[0].room, "3104");
    assert_eq!(entries[1].day_index, 2);
    assert_eq!(entries[1].room, "1201");
}

/// Test that server errors surface as status errors
#[tokio::test]
async fn test_fetch_schedule_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/schedule/data"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.fetch_schedule(&Group::new("PIN-21")).await;

    assert_eq!(result.unwrap_err(), UpstreamError::HttpStatus(503));
}

/// Test that an HTML error page is a parse error, not an empty schedule
#[tokio::test]
async fn test_fetch_schedule_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/schedule/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.fetch_schedule(&Group::new("PIN-21")).await;

    assert!(matches!(result, Err(UpstreamError::Parse(_))));
}

/// Test that a slow upstream hits the client timeout
#[tokio::test]
async fn test_fetch_schedule_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/schedule/data"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(schedule_json(&[]))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&mock_server)
        .await;

    let config = UpstreamConfig {
        base_url: mock_server.uri(),
        request_timeout_secs: 1,
        ..Default::default()
    };
    let client = UpstreamClient::new(&config).unwrap();
    let result = client.fetch_schedule(&Group::new("PIN-21")).await;

    assert_eq!(result.unwrap_err(), UpstreamError::Timeout);
}

#[tokio::test]
async fn test_fetch_groups_from_api() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/schedule/groups"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"["ПИН-22", "ПИН-21", "ПИН-22"]"#),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let groups = client.fetch_groups().await.unwrap();

    assert_eq!(ids(&groups), vec!["ПИН-21", "ПИН-22"]);
}

#[tokio::test]
async fn test_fetch_groups_falls_back_to_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/schedule/groups"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/schedule"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SCHEDULE_PAGE))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let groups = client.fetch_groups().await.unwrap();

    assert_eq!(ids(&groups), vec!["ИВТ-32", "ПИН-21"]);
}

#[tokio::test]
async fn test_fetch_groups_all_sources_failing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/schedule/groups"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/schedule"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.fetch_groups().await;

    assert_eq!(result.unwrap_err(), UpstreamError::HttpStatus(404));
}

#[tokio::test]
async fn test_fetch_groups_empty_page_is_empty_listing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/schedule/groups"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/schedule"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>Расписание обновляется</p></body></html>"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let groups = client.fetch_groups().await.unwrap();

    assert!(groups.is_empty());
}

#[tokio::test]
async fn test_fetch_groups_by_probing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/schedule/groups"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/schedule"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&mock_server)
        .await;

    // Only PM-21 has a timetable; every other probe gets an empty document
    Mock::given(method("POST"))
        .and(path("/schedule/data"))
        .and(body_string_contains("group=PM-21"))
        .respond_with(ResponseTemplate::new(200).set_body_string(schedule_json(&[(1, 1, "101")])))
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/schedule/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Times": [], "Data": []}"#))
        .mount(&mock_server)
        .await;

    let config = UpstreamConfig {
        base_url: mock_server.uri(),
        allow_group_guess: true,
        group_patterns: vec!["PM".to_string()],
        group_suffixes: vec![String::new()],
        group_guess_limit: 20,
        ..Default::default()
    };
    let client = UpstreamClient::new(&config).unwrap();
    let groups = client.fetch_groups().await.unwrap();

    assert_eq!(ids(&groups), vec!["PM-21"]);
}
