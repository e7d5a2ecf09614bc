//! freerooms - Free classroom finder for the MIET schedule
//!
//! Answers "which rooms are free on this day at this time?" by aggregating
//! every group's published timetable.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`upstream`] - HTTP client and wire formats of the schedule API
//! - [`cache`] - Single-flight TTL cache for group schedules
//! - [`engine`] - Bounded fan-out and free/occupied room aggregation
//! - [`mapper`] - Day and time input to weekday, pair and week parity
//! - [`catalog`] - The set of known rooms and how it is built
//! - [`pager`] - Stable pagination of results
//! - [`storage`] - Persistence of the group roster and rooms catalog
//! - [`service`] - The [`RoomFinder`](service::RoomFinder) facade
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use freerooms::config::Config;
//! use freerooms::service::RoomFinder;
//! use freerooms::upstream::UpstreamClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = UpstreamClient::new(&config.upstream)?;
//!     let finder = RoomFinder::new(Arc::new(client), &config)?;
//!     finder.load_state().await?;
//!
//!     let response = finder.query_free_rooms("today", "2", 0).await?;
//!     for room in &response.page.items {
//!         println!("{}", room.name);
//!     }
//!     Ok(())
//! }
//! ```

// Initialize rust-i18n at crate root level
rust_i18n::i18n!("locales", fallback = "en");

pub mod cache;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod i18n;
pub mod mapper;
pub mod models;
pub mod pager;
pub mod service;
pub mod storage;
pub mod upstream;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::RoomsCatalog;
    pub use crate::config::Config;
    pub use crate::engine::{AggregationEngine, Availability, ScheduleFetcher};
    pub use crate::error::{Error, ErrorCategory, FreeRoomsErrorTrait, Result};
    pub use crate::mapper::DayPairMapper;
    pub use crate::models::{Group, Pair, Room, ScheduleEntry, SlotQuery};
    pub use crate::pager::Page;
    pub use crate::service::{QueryOptions, QueryResponse, RoomFinder};
    pub use crate::upstream::{ScheduleSource, UpstreamClient};
}

// Direct re-exports for convenience
pub use models::{Group, Pair, Room, ScheduleEntry, SlotQuery};
