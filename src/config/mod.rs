//! Configuration management for freerooms
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Every section has defaults matching the
//! institution's public schedule API and bell schedule, so a file only needs the
//! keys it overrides.

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::StalePolicy;
use crate::models::Pair;
use crate::utils::retry::RetryConfig;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream schedule API
    pub upstream: UpstreamConfig,

    /// Schedule cache
    pub cache: CacheConfig,

    /// Aggregation fan-out
    pub engine: EngineConfig,

    /// Pairs, week rotation and local time
    pub calendar: CalendarConfig,

    /// Persisted roster and catalog
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Upstream client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme and host of the schedule API
    pub base_url: String,

    /// Per-group schedule endpoint (POST, form field `group`)
    pub schedule_path: String,

    /// Group roster endpoint (POST, JSON array)
    pub groups_path: String,

    /// HTML schedule page used as a roster fallback
    pub page_path: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,

    /// Local address to bind outgoing connections to (`ip` or `ip:port`)
    pub local_addr: Option<String>,

    /// Bind to `0.0.0.0` when no local address is set, forcing IPv4
    pub force_ipv4: bool,

    /// Accept invalid TLS certificates
    pub disable_tls_verify: bool,

    /// Outbound requests per second (unlimited when absent)
    pub rate_limit: Option<u32>,

    /// Probe generated group codes when neither the API nor the page lists groups
    pub allow_group_guess: bool,

    /// Faculty prefixes used when guessing group codes
    pub group_patterns: Vec<String>,

    /// Suffixes appended to guessed group codes (empty string = no suffix)
    pub group_suffixes: Vec<String>,

    /// Maximum number of guessed codes probed
    pub group_guess_limit: usize,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Schedule entry TTL in seconds
    pub ttl_secs: u64,

    /// Behaviour when a reload fails and an expired value exists
    pub stale_policy: StalePolicy,
}

/// Aggregation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum concurrent per-group fetches for one query
    pub max_concurrency: usize,

    /// Overall deadline for one availability query, in seconds
    pub query_deadline_secs: u64,

    /// Deadline for one catalog build, in seconds
    pub catalog_deadline_secs: u64,

    /// Retry policy applied to retryable upstream errors
    pub retry: RetryConfig,
}

/// Calendar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Ordered pairs of one day
    pub pairs: Vec<Pair>,

    /// Institution's offset from UTC in hours
    pub utc_offset_hours: i32,

    /// Monday (or any day) of the first week of the rotation
    pub semester_start: Option<NaiveDate>,

    /// Number of distinct week types in the rotation
    pub week_cycle: u8,

    /// Rooms per result page
    pub page_size: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the persisted collections
    pub data_dir: PathBuf,

    /// Groups roster file name
    pub groups_file: String,

    /// Rooms catalog file name
    pub rooms_file: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://miet.ru"),
            schedule_path: String::from("/schedule/data"),
            groups_path: String::from("/schedule/groups"),
            page_path: String::from("/schedule"),
            request_timeout_secs: 45,
            user_agent: String::from(DEFAULT_USER_AGENT),
            local_addr: None,
            force_ipv4: true,
            disable_tls_verify: false,
            rate_limit: None,
            allow_group_guess: false,
            group_patterns: ["ПМ", "ИВТ", "КТС", "БИ", "ИС", "ИТ"]
                .into_iter()
                .map(String::from)
                .collect(),
            group_suffixes: ["", "А", "Б"].into_iter().map(String::from).collect(),
            group_guess_limit: 300,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 120,
            stale_policy: StalePolicy::Propagate,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            query_deadline_secs: 30,
            catalog_deadline_secs: 300,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            pairs: default_pairs(),
            utc_offset_hours: 3,
            semester_start: None,
            week_cycle: 4,
            page_size: 40,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            groups_file: String::from("groups.json"),
            rooms_file: String::from("rooms.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// The institution's bell schedule
pub fn default_pairs() -> Vec<Pair> {
    const BELLS: [((u32, u32), (u32, u32)); 8] = [
        ((9, 0), (10, 20)),
        ((10, 30), (11, 50)),
        ((12, 0), (13, 20)),
        ((13, 30), (14, 50)),
        ((15, 0), (16, 20)),
        ((16, 30), (17, 50)),
        ((18, 0), (19, 20)),
        ((19, 30), (20, 50)),
    ];

    BELLS
        .iter()
        .zip(1u8..)
        .map(|((start, end), index)| {
            Pair::from_hm(index, *start, *end).expect("Invalid bell schedule")
        })
        .collect()
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => !matches!(value.trim().to_lowercase().as_str(), "0" | "false" | "no"),
        Err(_) => default,
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `FREEROOMS_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        let upstream = &mut self.upstream;
        if let Ok(url) = std::env::var("FREEROOMS_BASE_URL") {
            upstream.base_url = url;
        }
        if let Some(timeout) = env_parse("FREEROOMS_TIMEOUT") {
            upstream.request_timeout_secs = timeout;
        }
        if let Ok(agent) = std::env::var("FREEROOMS_USER_AGENT") {
            upstream.user_agent = agent;
        }
        if let Ok(addr) = std::env::var("FREEROOMS_LOCAL_ADDR") {
            let addr = addr.trim();
            upstream.local_addr = (!addr.is_empty()).then(|| addr.to_string());
        }
        upstream.force_ipv4 = env_flag("FREEROOMS_FORCE_IPV4", upstream.force_ipv4);
        upstream.disable_tls_verify =
            env_flag("FREEROOMS_DISABLE_SSL_VERIFY", upstream.disable_tls_verify);
        if let Some(rate) = env_parse("FREEROOMS_RATE_LIMIT") {
            upstream.rate_limit = Some(rate);
        }
        upstream.allow_group_guess = env_flag("FREEROOMS_GROUP_GUESS", upstream.allow_group_guess);
        if let Ok(patterns) = std::env::var("FREEROOMS_GROUP_PATTERNS") {
            upstream.group_patterns = split_list(&patterns, false);
        }
        if let Ok(suffixes) = std::env::var("FREEROOMS_GROUP_SUFFIXES") {
            upstream.group_suffixes = split_list(&suffixes, true);
        }
        if let Some(limit) = env_parse("FREEROOMS_GROUP_GUESS_LIMIT") {
            upstream.group_guess_limit = limit;
        }

        if let Some(ttl) = env_parse("FREEROOMS_CACHE_TTL") {
            self.cache.ttl_secs = ttl;
        }
        if std::env::var_os("FREEROOMS_SERVE_STALE").is_some() {
            self.cache.stale_policy = if env_flag("FREEROOMS_SERVE_STALE", false) {
                StalePolicy::ServeStale
            } else {
                StalePolicy::Propagate
            };
        }

        if let Some(concurrency) = env_parse("FREEROOMS_MAX_CONCURRENCY") {
            self.engine.max_concurrency = concurrency;
        }
        if let Some(deadline) = env_parse("FREEROOMS_QUERY_DEADLINE") {
            self.engine.query_deadline_secs = deadline;
        }
        if let Some(retries) = env_parse("FREEROOMS_MAX_RETRIES") {
            self.engine.retry.max_retries = retries;
        }

        if let Some(offset) = env_parse("FREEROOMS_UTC_OFFSET") {
            self.calendar.utc_offset_hours = offset;
        }
        if let Ok(start) = std::env::var("FREEROOMS_SEMESTER_START") {
            let date = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d")
                .with_context(|| format!("Invalid FREEROOMS_SEMESTER_START: {start}"))?;
            self.calendar.semester_start = Some(date);
        }
        if let Some(page_size) = env_parse("FREEROOMS_PAGE_SIZE") {
            self.calendar.page_size = page_size;
        }

        if let Ok(dir) = std::env::var("FREEROOMS_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        if let Ok(level) = std::env::var("FREEROOMS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("FREEROOMS_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.engine.max_concurrency == 0 {
            anyhow::bail!("max_concurrency must be greater than 0");
        }

        if self.upstream.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.upstream.rate_limit == Some(0) {
            anyhow::bail!("rate_limit must be positive when set");
        }

        if self.calendar.page_size == 0 {
            anyhow::bail!("page_size must be greater than 0");
        }

        if self.calendar.week_cycle == 0 {
            anyhow::bail!("week_cycle must be greater than 0");
        }

        if self.utc_offset().is_none() {
            anyhow::bail!("utc_offset_hours must be within -23..=23");
        }

        self.validate_pairs()?;

        if let Some(addr) = &self.upstream.local_addr {
            parse_local_addr(addr)?;
        }

        url::Url::parse(&self.upstream.base_url)
            .with_context(|| format!("Invalid base_url: {}", self.upstream.base_url))?;

        Ok(())
    }

    fn validate_pairs(&self) -> Result<()> {
        let pairs = &self.calendar.pairs;
        if pairs.is_empty() {
            anyhow::bail!("at least one pair must be configured");
        }

        for (position, pair) in pairs.iter().enumerate() {
            if usize::from(pair.index) != position + 1 {
                anyhow::bail!(
                    "pair indices must run 1..={} in order, found {} at position {}",
                    pairs.len(),
                    pair.index,
                    position + 1
                );
            }
            if pair.start >= pair.end {
                anyhow::bail!("pair {} must start before it ends", pair.index);
            }
        }

        for window in pairs.windows(2) {
            if window[1].start < window[0].end {
                anyhow::bail!(
                    "pair {} overlaps pair {}",
                    window[1].index,
                    window[0].index
                );
            }
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.request_timeout_secs)
    }

    /// Get cache TTL as Duration
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Get the per-query deadline as Duration
    #[must_use]
    pub fn query_deadline(&self) -> Duration {
        Duration::from_secs(self.engine.query_deadline_secs)
    }

    /// Get the catalog build deadline as Duration
    #[must_use]
    pub fn catalog_deadline(&self) -> Duration {
        Duration::from_secs(self.engine.catalog_deadline_secs)
    }

    /// The institution's fixed UTC offset
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.calendar.utc_offset_hours.checked_mul(3600)?)
    }

    /// Path of the persisted groups roster
    pub fn groups_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.groups_file)
    }

    /// Path of the persisted rooms catalog
    pub fn rooms_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.rooms_file)
    }
}

/// Parse a bind address given as `ip` or `ip:port`
///
/// A bare IP gets port 0. The HTTP client binds the IP only, so a nonzero
/// port is kept here for logging but never reaches the socket.
pub fn parse_local_addr(value: &str) -> Result<SocketAddr> {
    let value = value.trim();
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, 0));
    }
    value
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid local address: {value}"))
}

fn split_list(value: &str, keep_empty: bool) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| keep_empty || !item.is_empty())
        .collect()
}
