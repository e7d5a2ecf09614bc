//! Decoding of the institution's schedule JSON
//!
//! A response looks like:
//!
//! ```text
//! {
//!   "Times": [{"Time": "1 пара", "Code": 1, "TimeFrom": "...", "TimeTo": "..."}],
//!   "Data": [{
//!     "Day": 1, "DayNumber": 0,
//!     "Time": {"Code": 1, ...},
//!     "Class": {...}, "Group": {...},
//!     "Room": {"Code": 17, "Name": "3104"}
//!   }]
//! }
//! ```
//!
//! Field shapes drift between semesters, so several spellings are accepted:
//! `Day` as 1-based number or weekday name, `Time` as object, string or number
//! (or a flat `TimeCode`), `Room` as object or plain string. Items whose day, pair
//! or room cannot be determined are skipped.

use serde::Deserialize;

use crate::mapper::weekday_index;
use crate::models::ScheduleEntry;
use crate::utils::error::UpstreamError;
use crate::utils::normalize_whitespace;

/// Top-level schedule document
#[derive(Debug, Deserialize)]
pub struct ScheduleDocument {
    #[serde(rename = "Times", default)]
    pub times: Vec<serde_json::Value>,

    #[serde(rename = "Data", default)]
    pub data: Vec<RawItem>,
}

impl ScheduleDocument {
    /// The API answers unknown groups with an empty document
    pub fn is_known_group(&self) -> bool {
        !self.times.is_empty()
    }
}

/// One published class
#[derive(Debug, Deserialize)]
pub struct RawItem {
    #[serde(rename = "Day", default)]
    day: Option<NumberOrText>,

    #[serde(rename = "DayNumber", alias = "DayNum", default)]
    day_number: Option<NumberOrText>,

    #[serde(rename = "Time", default)]
    time: Option<TimeField>,

    #[serde(rename = "TimeCode", alias = "TimeID", default)]
    time_code: Option<NumberOrText>,

    #[serde(rename = "Room", default)]
    room: Option<RoomField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Text(String),
}

impl NumberOrText {
    fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(text) => leading_number(text),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimeField {
    Object {
        #[serde(rename = "Code", alias = "code", default)]
        code: Option<NumberOrText>,
    },
    Scalar(NumberOrText),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RoomField {
    Object {
        #[serde(rename = "Name", alias = "name", default)]
        name: Option<String>,
    },
    Text(String),
}

fn leading_number(text: &str) -> Option<i64> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

impl RawItem {
    fn day_index(&self) -> Option<u8> {
        match self.day.as_ref()? {
            NumberOrText::Number(n) => u8::try_from(*n).ok().filter(|d| (1..=7).contains(d)).map(|d| d - 1),
            NumberOrText::Text(text) => match leading_number(text) {
                Some(n) => u8::try_from(n).ok().filter(|d| (1..=7).contains(d)).map(|d| d - 1),
                None => weekday_index(text),
            },
        }
    }

    fn pair_index(&self) -> Option<u8> {
        let code = match &self.time {
            Some(TimeField::Object { code }) => code.as_ref().and_then(NumberOrText::as_number),
            Some(TimeField::Scalar(value)) => value.as_number(),
            None => None,
        }
        .or_else(|| self.time_code.as_ref().and_then(NumberOrText::as_number))?;

        u8::try_from(code).ok().filter(|pair| *pair >= 1)
    }

    fn room(&self) -> Option<String> {
        let raw = match self.room.as_ref()? {
            RoomField::Object { name } => name.as_deref()?,
            RoomField::Text(text) => text.as_str(),
        };
        let room = normalize_whitespace(raw);
        (!room.is_empty()).then_some(room)
    }

    fn week_parity(&self) -> Option<u8> {
        self.day_number
            .as_ref()
            .and_then(NumberOrText::as_number)
            .and_then(|n| u8::try_from(n).ok())
    }

    /// Convert into a schedule entry for `group`
    pub fn into_entry(self, group: &str) -> Option<ScheduleEntry> {
        Some(ScheduleEntry {
            group: group.to_string(),
            day_index: self.day_index()?,
            pair_index: self.pair_index()?,
            room: self.room()?,
            week_parity: self.week_parity(),
        })
    }
}

/// Decode a schedule body into a document
pub fn parse_document(body: &str) -> Result<ScheduleDocument, UpstreamError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if !value.is_object() {
        return Err(UpstreamError::Parse(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }
    Ok(serde_json::from_value(value)?)
}

/// Decode a schedule body into the entries of `group`
pub fn parse_schedule(group: &str, body: &str) -> Result<Vec<ScheduleEntry>, UpstreamError> {
    let document = parse_document(body)?;
    let total = document.data.len();

    let entries: Vec<ScheduleEntry> = document
        .data
        .into_iter()
        .filter_map(|item| item.into_entry(group))
        .collect();

    if entries.len() < total {
        tracing::debug!(
            group = %group,
            skipped = total - entries.len(),
            "Skipped schedule items without day, pair or room"
        );
    }

    Ok(entries)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
