//! Test fixtures for integration tests
//!
//! Provides configurations, stores and finders wired to in-memory sources

use chrono::NaiveDate;
use std::sync::Arc;

use freerooms::catalog::RoomsCatalog;
use freerooms::config::Config;
use freerooms::models::Group;
use freerooms::service::RoomFinder;
use freerooms::storage::MemoryStore;
use freerooms::utils::retry::RetryConfig;

use crate::common::FakeSource;

/// Monday 12 October 2026
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
}

/// Wednesday 14 October 2026
pub fn wednesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
}

/// Defaults with retries off and a small page
pub fn test_config(page_size: usize) -> Config {
    let mut config = Config::default();
    config.engine.retry = RetryConfig::disabled();
    config.engine.query_deadline_secs = 5;
    config.engine.catalog_deadline_secs = 5;
    config.calendar.page_size = page_size;
    config
}

pub struct Harness {
    pub finder: RoomFinder,
    pub source: Arc<FakeSource>,
    pub groups_store: Arc<MemoryStore<Vec<Group>>>,
    pub rooms_store: Arc<MemoryStore<RoomsCatalog>>,
}

/// A finder over `source` whose stores start with the given state
pub fn harness(
    source: FakeSource,
    config: &Config,
    groups: Option<Vec<Group>>,
    rooms: Option<RoomsCatalog>,
) -> Harness {
    let source = Arc::new(source);
    let groups_store = Arc::new(match groups {
        Some(groups) => MemoryStore::with_value(groups),
        None => MemoryStore::new(),
    });
    let rooms_store = Arc::new(match rooms {
        Some(rooms) => MemoryStore::with_value(rooms),
        None => MemoryStore::new(),
    });

    let finder = RoomFinder::with_stores(
        source.clone(),
        config,
        Box::new(Arc::clone(&groups_store)),
        Box::new(Arc::clone(&rooms_store)),
    )
    .unwrap();

    Harness {
        finder,
        source,
        groups_store,
        rooms_store,
    }
}

pub fn room_names(rooms: &[freerooms::models::Room]) -> Vec<&str> {
    rooms.iter().map(|room| room.name.as_str()).collect()
}
