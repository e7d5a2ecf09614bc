//! The rooms catalog: every room that appears in any group's schedule
//!
//! Rooms are deduplicated by their normalized key, so `" 3104"`, `"3104 "` and
//! `"3104"` are one room, and iteration is always in key order.

mod builder;

pub use builder::{CatalogBuild, CatalogBuilder};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::Room;
use crate::utils::normalize_key;

/// Deduplicated, ordered set of known rooms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Room>", into = "Vec<Room>")]
pub struct RoomsCatalog {
    rooms: BTreeMap<String, Room>,
}

impl RoomsCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from published room names; blank names are skipped
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| Room::parse(name.as_ref()))
            .collect()
    }

    /// Add a room; returns false if a room with the same key is already present
    pub fn insert(&mut self, room: Room) -> bool {
        let key = room.key();
        if self.rooms.contains_key(&key) {
            return false;
        }
        self.rooms.insert(key, room);
        true
    }

    /// Look up a room by any spelling of its name
    pub fn get(&self, name: &str) -> Option<&Room> {
        self.rooms.get(&normalize_key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Rooms in key order
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn to_vec(&self) -> Vec<Room> {
        self.rooms.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Two-digit numeric name prefixes, e.g. "31" for "3104"
    ///
    /// Numbered rooms share a prefix per building floor, which makes these a
    /// natural coarse filter.
    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self
            .rooms
            .values()
            .filter_map(|room| {
                let prefix: String = room.name.chars().take(2).collect();
                (prefix.chars().count() == 2 && prefix.chars().all(|c| c.is_ascii_digit()))
                    .then_some(prefix)
            })
            .collect();
        prefixes.dedup();
        prefixes
    }

    /// Restrict to rooms whose name starts with `prefix`
    ///
    /// An empty prefix or `"all"` keeps every room.
    pub fn filter_prefix(&self, prefix: &str) -> Self {
        let prefix = normalize_key(prefix);
        if prefix.is_empty() || prefix == "all" {
            return self.clone();
        }
        Self {
            rooms: self
                .rooms
                .iter()
                .filter(|(key, _)| key.starts_with(&prefix))
                .map(|(key, room)| (key.clone(), room.clone()))
                .collect(),
        }
    }
}

impl FromIterator<Room> for RoomsCatalog {
    fn from_iter<I: IntoIterator<Item = Room>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for room in iter {
            catalog.insert(room);
        }
        catalog
    }
}

impl From<Vec<Room>> for RoomsCatalog {
    fn from(rooms: Vec<Room>) -> Self {
        rooms.into_iter().collect()
    }
}

impl From<RoomsCatalog> for Vec<Room> {
    fn from(catalog: RoomsCatalog) -> Self {
        catalog.rooms.into_values().collect()
    }
}
