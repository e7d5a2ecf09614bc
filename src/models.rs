// Core data structures for freerooms

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::utils::{normalize_key, normalize_whitespace};

/// A cohort of students sharing one timetable
///
/// Deserializes from either a bare code (`"ПИН-21"`) or a full object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "GroupRepr")]
pub struct Group {
    /// Identifier the upstream API is keyed by (e.g., "ПИН-21")
    pub id: String,
    /// Name shown to users
    pub display_name: String,
}

impl Group {
    /// Create a group whose display name equals its id
    pub fn new(id: impl Into<String>) -> Self {
        let id = normalize_whitespace(&id.into());
        Self {
            display_name: id.clone(),
            id,
        }
    }

    /// Create a group with a distinct display name
    pub fn with_display_name(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: normalize_whitespace(&id.into()),
            display_name: normalize_whitespace(&display_name.into()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GroupRepr {
    Id(String),
    Full {
        id: String,
        #[serde(default)]
        display_name: Option<String>,
    },
}

impl From<GroupRepr> for Group {
    fn from(repr: GroupRepr) -> Self {
        match repr {
            GroupRepr::Id(id) | GroupRepr::Full { id, display_name: None } => Self::new(id),
            GroupRepr::Full {
                id,
                display_name: Some(name),
            } => Self::with_display_name(id, name),
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// A fixed class time-slot within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    /// 1-based position within the day
    pub index: u8,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl Pair {
    /// Create a pair from `(hour, minute)` bounds
    ///
    /// Returns `None` when either bound is not a valid clock time.
    pub fn from_hm(index: u8, start: (u32, u32), end: (u32, u32)) -> Option<Self> {
        Some(Self {
            index,
            start: NaiveTime::from_hms_opt(start.0, start.1, 0)?,
            end: NaiveTime::from_hms_opt(end.0, end.1, 0)?,
        })
    }

    /// Whether `time` lies in the half-open interval `[start, end)`
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }

    /// Human-readable bounds, e.g. "09:00-10:20"
    pub fn label(&self) -> String {
        format!("{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// One occupied slot for one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub group: String,
    /// 0 = Monday .. 6 = Sunday
    pub day_index: u8,
    /// 1-based pair index
    pub pair_index: u8,
    /// Room name as published (normalized whitespace)
    pub room: String,
    /// Week type within the institution's rotation, when the class is not weekly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_parity: Option<u8>,
}

impl ScheduleEntry {
    /// Whether this entry occupies its room for the queried slot
    ///
    /// An unknown parity on either side counts as a match, so entries that may
    /// occupy a room are never dropped.
    pub fn occupies(&self, slot: &SlotQuery) -> bool {
        if self.day_index != slot.day_index || self.pair_index != slot.pair_index {
            return false;
        }
        match (self.week_parity, slot.week_parity) {
            (Some(entry), Some(query)) => entry == query,
            _ => true,
        }
    }
}

/// Internal coordinates of one availability query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotQuery {
    pub day_index: u8,
    pub pair_index: u8,
    #[serde(default)]
    pub week_parity: Option<u8>,
}

impl SlotQuery {
    pub fn new(day_index: u8, pair_index: u8) -> Self {
        Self {
            day_index,
            pair_index,
            week_parity: None,
        }
    }

    pub fn with_week_parity(mut self, parity: Option<u8>) -> Self {
        self.week_parity = parity;
        self
    }
}

/// A physical room
///
/// Names are whitespace-normalized on construction; identity and ordering use
/// the lowercase [`Room::key`] first, then the building. A bare string
/// deserializes like [`Room::parse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RoomRepr")]
pub struct Room {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
}

impl Room {
    /// Build a room from a published name, deriving the building from it
    ///
    /// Returns `None` for names that are empty after normalization.
    pub fn parse(raw: &str) -> Option<Self> {
        let name = normalize_whitespace(raw);
        if name.is_empty() {
            return None;
        }
        let building = derive_building(&name);
        Some(Self { name, building })
    }

    /// Build a room with an explicit building
    pub fn with_building(name: &str, building: impl Into<String>) -> Self {
        Self {
            name: normalize_whitespace(name),
            building: Some(building.into()),
        }
    }

    /// Deduplication key: normalized, lowercased name
    pub fn key(&self) -> String {
        normalize_key(&self.name)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoomRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        building: Option<String>,
    },
}

impl TryFrom<RoomRepr> for Room {
    type Error = String;

    fn try_from(repr: RoomRepr) -> Result<Self, Self::Error> {
        let (name, building) = match repr {
            RoomRepr::Name(name) => (name, None),
            RoomRepr::Full { name, building } => (name, building),
        };
        let mut room = Self::parse(&name).ok_or_else(|| "empty room name".to_string())?;
        if building.is_some() {
            room.building = building;
        }
        Ok(room)
    }
}

/// Numbered rooms encode the building in their leading digit ("3104" is in building 3)
fn derive_building(name: &str) -> Option<String> {
    let digits = name.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits >= 3 {
        name.chars().next().map(String::from)
    } else {
        None
    }
}

impl PartialEq for Room {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key() && self.building == other.building
    }
}

impl Eq for Room {}

impl std::hash::Hash for Room {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
        self.building.hash(state);
    }
}

impl Ord for Room {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key()
            .cmp(&other.key())
            .then_with(|| self.building.cmp(&other.building))
    }
}

impl PartialOrd for Room {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Serde helper for `HH:MM` clock times (also accepts `HH:MM:SS`)
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
