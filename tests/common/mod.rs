//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use freerooms::cache::{StalePolicy, TtlCache};
use freerooms::engine::ScheduleFetcher;
use freerooms::models::{Group, ScheduleEntry};
use freerooms::upstream::ScheduleSource;
use freerooms::utils::error::UpstreamError;
use freerooms::utils::retry::RetryConfig;

/// In-memory schedule source with scripted answers
pub struct FakeSource {
    schedules: HashMap<String, Result<Vec<ScheduleEntry>, UpstreamError>>,
    delays: HashMap<String, Duration>,
    groups: Mutex<Result<Vec<Group>, UpstreamError>>,
    calls: Mutex<HashMap<String, usize>>,
    group_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            schedules: HashMap::new(),
            delays: HashMap::new(),
            groups: Mutex::new(Ok(Vec::new())),
            calls: Mutex::new(HashMap::new()),
            group_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_schedule(mut self, group: &str, entries: Vec<ScheduleEntry>) -> Self {
        self.schedules.insert(group.to_string(), Ok(entries));
        self
    }

    pub fn with_failure(mut self, group: &str, error: UpstreamError) -> Self {
        self.schedules.insert(group.to_string(), Err(error));
        self
    }

    pub fn with_delay(mut self, group: &str, delay: Duration) -> Self {
        self.delays.insert(group.to_string(), delay);
        self
    }

    pub fn with_groups(self, groups: Vec<Group>) -> Self {
        self.set_groups(Ok(groups));
        self
    }

    /// Change what the next roster fetch returns
    pub fn set_groups(&self, groups: Result<Vec<Group>, UpstreamError>) {
        *self.groups.lock().unwrap() = groups;
    }

    /// Schedule fetches made for `group`
    pub fn calls(&self, group: &str) -> usize {
        self.calls.lock().unwrap().get(group).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn group_calls(&self) -> usize {
        self.group_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScheduleSource for FakeSource {
    async fn fetch_schedule(&self, group: &Group) -> Result<Vec<ScheduleEntry>, UpstreamError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(group.id.clone())
            .or_default() += 1;

        if let Some(delay) = self.delays.get(&group.id) {
            tokio::time::sleep(*delay).await;
        }

        self.schedules
            .get(&group.id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_groups(&self) -> Result<Vec<Group>, UpstreamError> {
        self.group_calls.fetch_add(1, Ordering::SeqCst);
        self.groups.lock().unwrap().clone()
    }
}

/// Source that records how many schedule fetches overlap
pub struct GaugeSource {
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
}

impl GaugeSource {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScheduleSource for GaugeSource {
    async fn fetch_schedule(&self, group: &Group) -> Result<Vec<ScheduleEntry>, UpstreamError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(vec![entry(&group.id, 0, 2, &format!("R-{}", group.id))])
    }

    async fn fetch_groups(&self) -> Result<Vec<Group>, UpstreamError> {
        Ok(Vec::new())
    }
}

/// One schedule row valid in every week
pub fn entry(group: &str, day: u8, pair: u8, room: &str) -> ScheduleEntry {
    ScheduleEntry {
        group: group.to_string(),
        day_index: day,
        pair_index: pair,
        room: room.to_string(),
        week_parity: None,
    }
}

/// One schedule row valid only in week `parity`
pub fn entry_in_week(group: &str, day: u8, pair: u8, room: &str, parity: u8) -> ScheduleEntry {
    ScheduleEntry {
        week_parity: Some(parity),
        ..entry(group, day, pair, room)
    }
}

pub fn groups(ids: &[&str]) -> Vec<Group> {
    ids.iter().map(|id| Group::new(*id)).collect()
}

/// Fetcher without retries and a fresh cache
pub fn fetcher(source: Arc<FakeSource>) -> ScheduleFetcher {
    ScheduleFetcher::new(
        source,
        TtlCache::new(StalePolicy::Propagate),
        Duration::from_secs(120),
    )
    .with_retry(RetryConfig::disabled())
}

/// Schedule API body with the given `(day 1..7, pair, room)` rows
pub fn schedule_json(rows: &[(u8, u8, &str)]) -> String {
    let data: Vec<serde_json::Value> = rows
        .iter()
        .map(|(day, pair, room)| {
            serde_json::json!({
                "Day": day,
                "Time": {"Code": pair},
                "Room": {"Name": room},
            })
        })
        .collect();
    serde_json::json!({
        "Times": [{"Time": "1 пара", "Code": 1}],
        "Data": data,
    })
    .to_string()
}
