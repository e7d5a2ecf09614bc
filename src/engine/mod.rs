//! Room availability aggregation
//!
//! A query fans out over every group through the [`ScheduleFetcher`], unions
//! the rooms occupied at the requested slot, and subtracts them from the
//! catalog. Groups that fail do not fail the query: they are counted and
//! listed so the caller can flag the result as degraded.
//!
//! Within the catalog, `free` and `occupied` always partition it exactly.

mod fetcher;

pub use fetcher::{FailureReason, FetchReport, GroupFailure, ScheduleCache, ScheduleFetcher};

use std::collections::BTreeMap;
use std::time::Duration;

use crate::catalog::RoomsCatalog;
use crate::models::{Group, Room, ScheduleEntry, SlotQuery};

/// Result of one availability query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub slot: SlotQuery,
    /// Catalog rooms not used at `slot`, in room order
    pub free: Vec<Room>,
    /// Catalog rooms used at `slot`, in room order
    pub occupied: Vec<Room>,
    /// Rooms used at `slot` that the catalog does not know
    pub uncatalogued: Vec<Room>,
    /// Groups whose schedule was consulted
    pub fetched: usize,
    /// Groups whose schedule could not be consulted
    pub failed: usize,
    pub failures: Vec<GroupFailure>,
}

impl Availability {
    /// Some groups were not consulted; a listed free room may be taken
    pub fn is_degraded(&self) -> bool {
        self.failed > 0
    }

    /// No group was consulted even though there were groups to consult
    pub fn fully_degraded(&self) -> bool {
        self.failed > 0 && self.fetched == 0
    }
}

/// Occupancy of a slot split against a catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Occupancy {
    pub free: Vec<Room>,
    pub occupied: Vec<Room>,
    pub uncatalogued: Vec<Room>,
}

/// Split `catalog` into free and occupied rooms for `slot`
pub fn compute_occupancy<'a>(
    slot: &SlotQuery,
    entries: impl IntoIterator<Item = &'a ScheduleEntry>,
    catalog: &RoomsCatalog,
) -> Occupancy {
    let used: BTreeMap<String, Room> = entries
        .into_iter()
        .filter(|entry| entry.occupies(slot))
        .filter_map(|entry| Room::parse(&entry.room))
        .map(|room| (room.key(), room))
        .collect();

    let mut occupancy = Occupancy::default();
    for room in catalog.rooms() {
        if used.contains_key(&room.key()) {
            occupancy.occupied.push(room.clone());
        } else {
            occupancy.free.push(room.clone());
        }
    }
    occupancy.uncatalogued = used
        .into_values()
        .filter(|room| !catalog.contains(&room.name))
        .collect();

    occupancy
}

/// Answers "which rooms are free" queries
pub struct AggregationEngine {
    fetcher: ScheduleFetcher,
    deadline: Duration,
}

impl AggregationEngine {
    pub fn new(fetcher: ScheduleFetcher, deadline: Duration) -> Self {
        Self { fetcher, deadline }
    }

    pub fn fetcher(&self) -> &ScheduleFetcher {
        &self.fetcher
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Rooms of `catalog` free at `slot`, consulting every group in `groups`
    pub async fn free_rooms(
        &self,
        slot: &SlotQuery,
        groups: &[Group],
        catalog: &RoomsCatalog,
    ) -> Availability {
        let report = self.fetcher.fetch_all(groups, self.deadline).await;

        let occupancy = compute_occupancy(
            slot,
            report.schedules.iter().flat_map(|(_, entries)| entries.iter()),
            catalog,
        );

        let availability = Availability {
            slot: *slot,
            free: occupancy.free,
            occupied: occupancy.occupied,
            uncatalogued: occupancy.uncatalogued,
            fetched: report.schedules.len(),
            failed: report.failures.len(),
            failures: report.failures,
        };

        tracing::info!(
            day = slot.day_index,
            pair = slot.pair_index,
            parity = ?slot.week_parity,
            free = availability.free.len(),
            occupied = availability.occupied.len(),
            fetched = availability.fetched,
            failed = availability.failed,
            "Availability computed"
        );
        if !availability.uncatalogued.is_empty() {
            tracing::debug!(
                rooms = availability.uncatalogued.len(),
                "Occupied rooms missing from catalog"
            );
        }

        availability
    }
}
