//! Access to the institution's published schedules
//!
//! [`ScheduleSource`] is the seam the engine and the roster refresh depend on.
//! [`UpstreamClient`] implements it over HTTP; tests substitute in-memory sources.

pub mod client;
pub mod groups;
pub mod wire;

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{Group, ScheduleEntry};
use crate::utils::error::UpstreamError;

pub use client::UpstreamClient;

/// Source of group rosters and per-group schedules
///
/// Implementations do not retry; callers decide using
/// [`UpstreamError::is_retryable`].
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Fetch every published entry of one group
    async fn fetch_schedule(&self, group: &Group) -> Result<Vec<ScheduleEntry>, UpstreamError>;

    /// Fetch the current group roster
    async fn fetch_groups(&self) -> Result<Vec<Group>, UpstreamError>;
}

#[async_trait]
impl<T: ScheduleSource + ?Sized> ScheduleSource for Arc<T> {
    async fn fetch_schedule(&self, group: &Group) -> Result<Vec<ScheduleEntry>, UpstreamError> {
        (**self).fetch_schedule(group).await
    }

    async fn fetch_groups(&self) -> Result<Vec<Group>, UpstreamError> {
        (**self).fetch_groups().await
    }
}
