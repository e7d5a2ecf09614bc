//! Bounded, deadline-aware fan-out over group schedules
//!
//! Every schedule read goes through the shared [`ScheduleCache`], so one group
//! is fetched at most once per TTL no matter how many queries or catalog
//! builds ask for it concurrently.

use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::models::{Group, ScheduleEntry};
use crate::upstream::ScheduleSource;
use crate::utils::error::UpstreamError;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Per-group schedule cache shared by queries and catalog builds
pub type ScheduleCache = TtlCache<String, Arc<Vec<ScheduleEntry>>, UpstreamError>;

const DEFAULT_CONCURRENCY: usize = 10;

/// Why a group is missing from a result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The overall deadline passed before the group finished
    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

/// A group whose schedule could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFailure {
    pub group: String,
    pub reason: FailureReason,
}

/// Schedules gathered by one fan-out
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// `(group id, entries)` in group id order
    pub schedules: Vec<(String, Arc<Vec<ScheduleEntry>>)>,
    /// Failures in group id order
    pub failures: Vec<GroupFailure>,
}

/// Cached, retrying, concurrency-bounded schedule reader
#[derive(Clone)]
pub struct ScheduleFetcher {
    source: Arc<dyn ScheduleSource>,
    cache: ScheduleCache,
    ttl: Duration,
    max_concurrency: usize,
    retry: RetryConfig,
}

impl ScheduleFetcher {
    pub fn new(source: Arc<dyn ScheduleSource>, cache: ScheduleCache, ttl: Duration) -> Self {
        Self {
            source,
            cache,
            ttl,
            max_concurrency: DEFAULT_CONCURRENCY,
            retry: RetryConfig::default(),
        }
    }

    /// Build from configuration with a fresh cache
    pub fn from_config(source: Arc<dyn ScheduleSource>, config: &Config) -> Self {
        Self::new(
            source,
            TtlCache::new(config.cache.stale_policy),
            config.cache_ttl(),
        )
        .with_max_concurrency(config.engine.max_concurrency)
        .with_retry(config.engine.retry.clone())
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &ScheduleCache {
        &self.cache
    }

    pub fn source(&self) -> &Arc<dyn ScheduleSource> {
        &self.source
    }

    /// Schedule of one group, from cache or upstream
    ///
    /// Retryable upstream errors are retried inside the cached load, so
    /// concurrent callers share the retries too.
    pub async fn fetch_one(&self, group: &Group) -> Result<Arc<Vec<ScheduleEntry>>, UpstreamError> {
        let source = Arc::clone(&self.source);
        let retry = self.retry.clone();
        let group = group.clone();

        self.cache
            .get(group.id.clone(), self.ttl, move || async move {
                with_retry_if(
                    &retry,
                    || source.fetch_schedule(&group),
                    UpstreamError::is_retryable,
                )
                .await
                .map(Arc::new)
            })
            .await
    }

    /// Fetch every group with at most `max_concurrency` in flight
    ///
    /// Groups still unfinished when `deadline` elapses are reported with
    /// [`FailureReason::DeadlineExceeded`]; their loads keep running in the
    /// background and land in the cache.
    pub async fn fetch_all(&self, groups: &[Group], deadline: Duration) -> FetchReport {
        let deadline = Instant::now() + deadline;

        let mut pending: BTreeSet<&str> = groups.iter().map(|g| g.id.as_str()).collect();
        let unique: Vec<&Group> = {
            let mut seen = BTreeSet::new();
            groups.iter().filter(|g| seen.insert(g.id.as_str())).collect()
        };

        let mut report = FetchReport::default();
        let mut results = stream::iter(unique)
            .map(|group| async move { (group, self.fetch_one(group).await) })
            .buffer_unordered(self.max_concurrency);

        loop {
            match tokio::time::timeout_at(deadline, results.next()).await {
                Ok(Some((group, result))) => {
                    pending.remove(group.id.as_str());
                    match result {
                        Ok(entries) => report.schedules.push((group.id.clone(), entries)),
                        Err(e) => {
                            tracing::warn!(group = %group.id, error = %e, "Failed to fetch schedule");
                            report.failures.push(GroupFailure {
                                group: group.id.clone(),
                                reason: FailureReason::Upstream(e),
                            });
                        }
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(unfinished = pending.len(), "Fan-out deadline exceeded");
                    break;
                }
            }
        }
        drop(results);

        report.failures.extend(pending.into_iter().map(|group| GroupFailure {
            group: group.to_string(),
            reason: FailureReason::DeadlineExceeded,
        }));

        report.schedules.sort_by(|a, b| a.0.cmp(&b.0));
        report.failures.sort_by(|a, b| a.group.cmp(&b.group));
        report
    }
}
