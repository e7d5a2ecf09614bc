//! Catalog construction from every group's schedule

use std::time::Duration;

use super::RoomsCatalog;
use crate::engine::{GroupFailure, ScheduleFetcher};
use crate::models::{Group, Room};

/// Outcome of one catalog build
#[derive(Debug, Clone, Default)]
pub struct CatalogBuild {
    pub catalog: RoomsCatalog,
    /// Groups whose schedule contributed
    pub fetched: usize,
    /// Groups that could not be fetched; their rooms may be missing
    pub failures: Vec<GroupFailure>,
}

impl CatalogBuild {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Collects the distinct rooms of every group's schedule
pub struct CatalogBuilder<'a> {
    fetcher: &'a ScheduleFetcher,
    deadline: Duration,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(fetcher: &'a ScheduleFetcher, deadline: Duration) -> Self {
        Self { fetcher, deadline }
    }

    /// Fetch every group and gather the rooms they use
    ///
    /// Per-group failures are collected, never fatal.
    pub async fn build(&self, groups: &[Group]) -> CatalogBuild {
        let report = self.fetcher.fetch_all(groups, self.deadline).await;

        let catalog: RoomsCatalog = report
            .schedules
            .iter()
            .flat_map(|(_, entries)| entries.iter())
            .filter_map(|entry| Room::parse(&entry.room))
            .collect();

        tracing::info!(
            groups = groups.len(),
            fetched = report.schedules.len(),
            failed = report.failures.len(),
            rooms = catalog.len(),
            "Rooms catalog built"
        );

        CatalogBuild {
            catalog,
            fetched: report.schedules.len(),
            failures: report.failures,
        }
    }
}
