//! Group roster extraction
//!
//! The roster comes from the first source that yields anything:
//! 1. The JSON groups endpoint (an array of codes)
//! 2. `<select>` elements whose id or name mentions "group" on the schedule page
//! 3. Group-code shaped tokens anywhere on that page
//! 4. Probing generated codes against the schedule endpoint (opt-in)
//!
//! This module holds the pure parsing half; the HTTP half lives in
//! [`UpstreamClient`](super::UpstreamClient).

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::models::Group;
use crate::utils::error::UpstreamError;

macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    static ref SELECT: Selector = parse_selector!("select");
    static ref OPTION: Selector = parse_selector!("option");
    static ref GROUP_CODE: Regex =
        Regex::new(r"[A-ZА-Я]{1,6}-\d{2}[A-ZА-Я]?").expect("Invalid group code regex");
}

/// Stem of placeholder options such as "Выберите группу"
const PLACEHOLDER: &str = "групп";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RosterItem {
    Code(String),
    Object {
        #[serde(rename = "Name", alias = "name")]
        name: String,
    },
}

/// Deduplicate by id, drop blanks and sort
pub fn normalize_groups(groups: impl IntoIterator<Item = Group>) -> Vec<Group> {
    let unique: BTreeMap<String, Group> = groups
        .into_iter()
        .filter(|group| !group.id.is_empty())
        .map(|group| (group.id.clone(), group))
        .collect();
    unique.into_values().collect()
}

/// Parse the groups endpoint body
pub fn parse_groups_json(body: &str) -> Result<Vec<Group>, UpstreamError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if !value.is_array() {
        return Err(UpstreamError::Parse(
            "groups endpoint did not return an array".to_string(),
        ));
    }

    let items: Vec<Option<RosterItem>> = serde_json::from_value(value)?;
    Ok(normalize_groups(items.into_iter().flatten().map(|item| match item {
        RosterItem::Code(code) => Group::new(code),
        RosterItem::Object { name } => Group::new(name),
    })))
}

/// Extract group codes from the schedule page
pub fn extract_groups_from_html(html: &str) -> Vec<Group> {
    let document = Html::parse_document(html);
    let mut groups = Vec::new();

    for select in document.select(&SELECT) {
        let attr = |name: &str| select.value().attr(name).unwrap_or_default().to_lowercase();
        if !attr("id").contains("group") && !attr("name").contains("group") {
            continue;
        }

        for option in select.select(&OPTION) {
            let value = match option.value().attr("value") {
                Some(value) if !value.trim().is_empty() => value.trim().to_string(),
                _ => option.text().collect::<String>().trim().to_string(),
            };
            if value.is_empty() || value.to_lowercase().contains(PLACEHOLDER) {
                continue;
            }
            groups.push(Group::new(value));
        }
    }

    if groups.is_empty() {
        groups.extend(
            GROUP_CODE
                .find_iter(html)
                .map(|code| Group::new(code.as_str())),
        );
    }

    normalize_groups(groups)
}

/// Generate candidate codes `PREFIX-YYsuffix` for years 10..60, capped at `limit`
pub fn candidate_groups(patterns: &[String], suffixes: &[String], limit: usize) -> Vec<String> {
    patterns
        .iter()
        .map(|prefix| prefix.trim())
        .filter(|prefix| !prefix.is_empty())
        .flat_map(|prefix| {
            (10..60).flat_map(move |year| {
                suffixes
                    .iter()
                    .map(move |suffix| format!("{prefix}-{year:02}{}", suffix.trim()))
            })
        })
        .take(limit)
        .collect()
}
