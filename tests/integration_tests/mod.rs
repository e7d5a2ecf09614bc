//! Integration tests module
//!
//! This module provides end-to-end integration tests for the room finder,
//! including:
//! - Query, paging and prefix filtering through `RoomFinder`
//! - Roster and catalog refresh with persistence
//! - Error handling and degraded answers

pub mod error_scenarios;
pub mod fixtures;
pub mod service_test;
