//! The room finder service
//!
//! [`RoomFinder`] ties the pieces together:
//!
//! ```text
//! query(day, slot) -> DayPairMapper -> AggregationEngine -> ScheduleFetcher -> TtlCache
//!                  -> UpstreamClient -> occupied rooms -> catalog - occupied -> pager
//! ```
//!
//! The group roster and the rooms catalog are process-wide [`Snapshot`]s,
//! persisted through [`Collection`]s and replaced whole on refresh. A refresh
//! that finds nothing keeps the previous state.

mod snapshot;

pub use snapshot::Snapshot;

use chrono::{FixedOffset, NaiveDate, Utc};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::catalog::{CatalogBuilder, RoomsCatalog};
use crate::config::Config;
use crate::engine::{AggregationEngine, Availability, GroupFailure, ScheduleFetcher};
use crate::error::{Error, Result};
use crate::mapper::{DayPairMapper, ResolvedDay};
use crate::models::{Group, Pair, Room};
use crate::pager::{page, Page};
use crate::storage::{Collection, JsonFileStore};
use crate::upstream::ScheduleSource;
use crate::utils::error::UpstreamError;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Optional query refinements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Only list rooms whose name starts with this prefix
    pub prefix: Option<String>,
}

impl QueryOptions {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

/// Answer to one free-rooms query
#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub day: ResolvedDay,
    pub pair: Pair,
    pub prefix: Option<String>,
    /// The requested page of free rooms (after the prefix filter)
    pub page: Page<Room>,
    /// Full, unfiltered availability
    pub availability: Availability,
}

impl QueryResponse {
    pub fn is_degraded(&self) -> bool {
        self.availability.is_degraded()
    }

    pub fn fully_degraded(&self) -> bool {
        self.availability.fully_degraded()
    }
}

/// State restored by [`RoomFinder::load_state`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedState {
    pub groups: usize,
    pub rooms: usize,
}

/// Outcome of [`RoomFinder::refresh_groups`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupsRefresh {
    /// Groups held after the refresh
    pub count: usize,
    /// False when the upstream listed nothing and the old roster was kept
    pub replaced: bool,
}

/// Outcome of [`RoomFinder::refresh_rooms_catalog`]
#[derive(Debug, Clone)]
pub struct CatalogRefresh {
    /// Rooms held after the refresh
    pub count: usize,
    /// Groups whose schedule contributed
    pub fetched: usize,
    pub failures: Vec<GroupFailure>,
    /// False when no room was found and the old catalog was kept
    pub replaced: bool,
}

/// Free classroom finder
pub struct RoomFinder {
    source: Arc<dyn ScheduleSource>,
    engine: AggregationEngine,
    mapper: DayPairMapper,
    groups: Snapshot<Vec<Group>>,
    catalog: Snapshot<RoomsCatalog>,
    groups_store: Box<dyn Collection<Vec<Group>>>,
    rooms_store: Box<dyn Collection<RoomsCatalog>>,
    page_size: NonZeroUsize,
    utc_offset: FixedOffset,
    catalog_deadline: Duration,
    retry: RetryConfig,
    refresh_lock: Mutex<()>,
}

impl RoomFinder {
    /// Create a finder persisting to the JSON files named in `config`
    pub fn new(source: Arc<dyn ScheduleSource>, config: &Config) -> Result<Self> {
        Self::with_stores(
            source,
            config,
            Box::new(JsonFileStore::<Vec<Group>>::new(config.groups_path())),
            Box::new(JsonFileStore::<RoomsCatalog>::new(config.rooms_path())),
        )
    }

    /// Create a finder with explicit persistence backends
    pub fn with_stores(
        source: Arc<dyn ScheduleSource>,
        config: &Config,
        groups_store: Box<dyn Collection<Vec<Group>>>,
        rooms_store: Box<dyn Collection<RoomsCatalog>>,
    ) -> Result<Self> {
        config.validate().map_err(|e| Error::config(format!("{e:#}")))?;

        let page_size = NonZeroUsize::new(config.calendar.page_size)
            .ok_or_else(|| Error::config("page_size must be greater than 0"))?;
        let utc_offset = config
            .utc_offset()
            .ok_or_else(|| Error::config("utc_offset_hours out of range"))?;

        let fetcher = ScheduleFetcher::from_config(Arc::clone(&source), config);

        Ok(Self {
            engine: AggregationEngine::new(fetcher, config.query_deadline()),
            mapper: DayPairMapper::from_config(&config.calendar),
            source,
            groups: Snapshot::default(),
            catalog: Snapshot::default(),
            groups_store,
            rooms_store,
            page_size,
            utc_offset,
            catalog_deadline: config.catalog_deadline(),
            retry: config.engine.retry.clone(),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn mapper(&self) -> &DayPairMapper {
        &self.mapper
    }

    pub fn engine(&self) -> &AggregationEngine {
        &self.engine
    }

    /// Current group roster
    pub async fn groups(&self) -> Arc<Vec<Group>> {
        self.groups.load().await
    }

    /// Current rooms catalog
    pub async fn catalog(&self) -> Arc<RoomsCatalog> {
        self.catalog.load().await
    }

    /// Today's date at the institution
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.utc_offset).date_naive()
    }

    /// Restore the persisted roster and catalog
    pub async fn load_state(&self) -> Result<LoadedState> {
        let groups = self.groups_store.load()?.unwrap_or_default();
        let catalog = self.rooms_store.load()?.unwrap_or_default();

        let state = LoadedState {
            groups: groups.len(),
            rooms: catalog.len(),
        };
        self.groups.replace(groups).await;
        self.catalog.replace(catalog).await;

        tracing::info!(groups = state.groups, rooms = state.rooms, "State loaded");
        Ok(state)
    }

    /// Re-fetch the group roster and persist it
    pub async fn refresh_groups(&self) -> Result<GroupsRefresh> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_groups_locked().await
    }

    async fn refresh_groups_locked(&self) -> Result<GroupsRefresh> {
        let fetched = with_retry_if(
            &self.retry,
            || self.source.fetch_groups(),
            UpstreamError::is_retryable,
        )
        .await?;

        if fetched.is_empty() {
            let count = self.groups.load().await.len();
            tracing::warn!(kept = count, "Upstream listed no groups, keeping current roster");
            return Ok(GroupsRefresh {
                count,
                replaced: false,
            });
        }

        self.groups_store.save(&fetched)?;
        let count = fetched.len();
        self.groups.replace(fetched).await;

        tracing::info!(count, "Group roster refreshed");
        Ok(GroupsRefresh {
            count,
            replaced: true,
        })
    }

    /// Rebuild the rooms catalog from every group's schedule and persist it
    ///
    /// Fetches the roster first when none is loaded.
    pub async fn refresh_rooms_catalog(&self) -> Result<CatalogRefresh> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_catalog_locked().await
    }

    async fn refresh_catalog_locked(&self) -> Result<CatalogRefresh> {
        if self.groups.load().await.is_empty() {
            self.refresh_groups_locked().await?;
        }
        let groups = self.groups.load().await;

        let build = CatalogBuilder::new(self.engine.fetcher(), self.catalog_deadline)
            .build(&groups)
            .await;

        if build.catalog.is_empty() {
            let count = self.catalog.load().await.len();
            tracing::warn!(
                kept = count,
                failed = build.failures.len(),
                "No rooms found, keeping current catalog"
            );
            return Ok(CatalogRefresh {
                count,
                fetched: build.fetched,
                failures: build.failures,
                replaced: false,
            });
        }

        self.rooms_store.save(&build.catalog)?;
        let count = build.catalog.len();
        self.catalog.replace(build.catalog).await;

        Ok(CatalogRefresh {
            count,
            fetched: build.fetched,
            failures: build.failures,
            replaced: true,
        })
    }

    /// Fetch the roster and build the catalog when either is missing
    ///
    /// Failures are logged and leave the missing part empty.
    async fn ensure_state(&self) -> (Arc<Vec<Group>>, Arc<RoomsCatalog>) {
        let groups = self.groups.load().await;
        let catalog = self.catalog.load().await;
        if !groups.is_empty() && !catalog.is_empty() {
            return (groups, catalog);
        }

        let _guard = self.refresh_lock.lock().await;
        if self.groups.load().await.is_empty() {
            tracing::warn!("Group roster is empty, fetching it before answering");
            if let Err(e) = self.refresh_groups_locked().await {
                tracing::error!(error = %e, "Failed to fetch group roster");
            }
        }

        let groups = self.groups.load().await;
        if groups.is_empty() {
            return (groups, self.catalog.load().await);
        }

        if self.catalog.load().await.is_empty() {
            tracing::warn!("Rooms catalog is empty, building it before answering");
            if let Err(e) = self.refresh_catalog_locked().await {
                tracing::error!(error = %e, "Failed to build rooms catalog");
            }
        }
        (groups, self.catalog.load().await)
    }

    /// Free rooms for a day and a slot, today being the institution's date
    pub async fn query_free_rooms(
        &self,
        day_input: &str,
        slot_input: &str,
        page_index: usize,
    ) -> Result<QueryResponse> {
        self.query_with_options(day_input, slot_input, page_index, &QueryOptions::default())
            .await
    }

    /// [`query_free_rooms`](Self::query_free_rooms) with refinements
    pub async fn query_with_options(
        &self,
        day_input: &str,
        slot_input: &str,
        page_index: usize,
        options: &QueryOptions,
    ) -> Result<QueryResponse> {
        self.query_on(self.today(), day_input, slot_input, page_index, options)
            .await
    }

    /// Free rooms with relative days resolved against `today`
    pub async fn query_on(
        &self,
        today: NaiveDate,
        day_input: &str,
        slot_input: &str,
        page_index: usize,
        options: &QueryOptions,
    ) -> Result<QueryResponse> {
        let day = self.mapper.resolve_day(day_input, today)?;
        let pair_index = self.mapper.resolve_slot(slot_input)?;
        let pair = *self
            .mapper
            .pair(pair_index)
            .ok_or_else(|| Error::other(format!("pair {pair_index} is not configured")))?;
        let slot = day.slot(pair_index);

        let (groups, catalog) = self.ensure_state().await;
        let availability = self.engine.free_rooms(&slot, &groups, &catalog).await;

        let prefix = options
            .prefix
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty() && *p != "all");
        let listed: Vec<Room> = match prefix {
            Some(prefix) => {
                let subset = catalog.filter_prefix(prefix);
                availability
                    .free
                    .iter()
                    .filter(|room| subset.contains(&room.name))
                    .cloned()
                    .collect()
            }
            None => availability.free.clone(),
        };

        Ok(QueryResponse {
            day,
            pair,
            prefix: prefix.map(String::from),
            page: page(&listed, self.page_size, page_index),
            availability,
        })
    }
}
