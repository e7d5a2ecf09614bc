//! HTTP client for the schedule API
//!
//! One `reqwest::Client` is shared by every request. It carries:
//! - A bounded per-request timeout
//! - An optional local bind address, or `0.0.0.0` to force IPv4
//! - Optional TLS verification bypass for campus networks with intercepting proxies
//! - An optional `governor` rate limit
//!
//! Requests are never retried here.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT},
    Client, Response,
};
use std::net::{IpAddr, Ipv4Addr};
use std::num::NonZeroU32;
use std::time::Duration;
use url::Url;

use super::groups::{candidate_groups, extract_groups_from_html, normalize_groups, parse_groups_json};
use super::wire::{parse_document, parse_schedule};
use super::ScheduleSource;
use crate::config::{parse_local_addr, UpstreamConfig};
use crate::models::{Group, ScheduleEntry};
use crate::utils::error::UpstreamError;
use crate::utils::truncate_text;

/// Concurrent probes while guessing group codes
const GUESS_CONCURRENCY: usize = 10;

/// Schedule API client
pub struct UpstreamClient {
    /// HTTP client with timeout, bind address and TLS settings applied
    client: Client,

    schedule_url: Url,
    groups_url: Url,
    page_url: Url,

    /// Outbound request limiter, when configured
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,

    allow_group_guess: bool,
    group_patterns: Vec<String>,
    group_suffixes: Vec<String>,
    group_guess_limit: usize,
}

impl UpstreamClient {
    /// Create a client from the upstream configuration
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::Transport` if the base URL or local address is
    /// invalid, or the HTTP client cannot be built
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| UpstreamError::Transport(format!("invalid base URL {}: {e}", config.base_url)))?;

        let local_address = match &config.local_addr {
            Some(addr) => {
                let addr =
                    parse_local_addr(addr).map_err(|e| UpstreamError::Transport(e.to_string()))?;
                if addr.port() != 0 {
                    tracing::warn!(
                        local_addr = %addr,
                        "Outbound requests bind the local IP only, ignoring port"
                    );
                }
                Some(addr.ip())
            }
            None if config.force_ipv4 => Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            None => None,
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/html;q=0.9, */*;q=0.8"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .local_address(local_address)
            .danger_accept_invalid_certs(config.disable_tls_verify)
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let rate_limiter = config
            .rate_limit
            .and_then(NonZeroU32::new)
            .map(|rate| RateLimiter::direct(Quota::per_second(rate)));

        tracing::debug!(
            base_url = %base,
            local_address = ?local_address,
            rate_limit = ?config.rate_limit,
            "Upstream client configured"
        );

        Ok(Self {
            client,
            schedule_url: endpoint(&base, &config.schedule_path)?,
            groups_url: endpoint(&base, &config.groups_path)?,
            page_url: endpoint(&base, &config.page_path)?,
            rate_limiter,
            allow_group_guess: config.allow_group_guess,
            group_patterns: config.group_patterns.clone(),
            group_suffixes: config.group_suffixes.clone(),
            group_guess_limit: config.group_guess_limit,
        })
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
    }

    async fn read_body(response: Response) -> Result<String, UpstreamError> {
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::HttpStatus(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    /// POST the schedule form for one group code and return the raw body
    pub async fn fetch_schedule_body(&self, group_id: &str) -> Result<String, UpstreamError> {
        self.throttle().await;
        let response = self
            .client
            .post(self.schedule_url.clone())
            .form(&[("group", group_id)])
            .send()
            .await?;
        Self::read_body(response).await
    }

    async fn fetch_groups_api(&self) -> Result<Vec<Group>, UpstreamError> {
        self.throttle().await;
        let response = self.client.post(self.groups_url.clone()).send().await?;
        let body = Self::read_body(response).await?;
        parse_groups_json(&body).map_err(|e| {
            tracing::debug!(body = %truncate_text(&body, 200), "Unexpected groups response");
            e
        })
    }

    async fn fetch_groups_page(&self) -> Result<Vec<Group>, UpstreamError> {
        self.throttle().await;
        let response = self.client.get(self.page_url.clone()).send().await?;
        let html = Self::read_body(response).await?;
        Ok(extract_groups_from_html(&html))
    }

    /// Whether the schedule endpoint knows `code`
    async fn probe_group(&self, code: &str) -> bool {
        match self.fetch_schedule_body(code).await {
            Ok(body) => parse_document(&body)
                .map(|document| document.is_known_group())
                .unwrap_or(false),
            Err(e) => {
                tracing::trace!(group = %code, error = %e, "Probe failed");
                false
            }
        }
    }

    async fn guess_groups(&self) -> Vec<Group> {
        let candidates = candidate_groups(
            &self.group_patterns,
            &self.group_suffixes,
            self.group_guess_limit,
        );
        tracing::info!(candidates = candidates.len(), "Probing generated group codes");

        let found: Vec<Group> = stream::iter(candidates)
            .map(|code| async move { self.probe_group(&code).await.then(|| Group::new(code)) })
            .buffer_unordered(GUESS_CONCURRENCY)
            .filter_map(|group| async move { group })
            .collect()
            .await;

        normalize_groups(found)
    }
}

fn endpoint(base: &Url, path: &str) -> Result<Url, UpstreamError> {
    base.join(path)
        .map_err(|e| UpstreamError::Transport(format!("invalid endpoint {path}: {e}")))
}

#[async_trait]
impl ScheduleSource for UpstreamClient {
    async fn fetch_schedule(&self, group: &Group) -> Result<Vec<ScheduleEntry>, UpstreamError> {
        let body = self.fetch_schedule_body(&group.id).await?;
        let entries = parse_schedule(&group.id, &body)?;
        tracing::debug!(group = %group.id, entries = entries.len(), "Fetched schedule");
        Ok(entries)
    }

    async fn fetch_groups(&self) -> Result<Vec<Group>, UpstreamError> {
        let mut last_error = None;

        match self.fetch_groups_api().await {
            Ok(groups) if !groups.is_empty() => {
                tracing::info!(count = groups.len(), "Loaded groups from API");
                return Ok(groups);
            }
            Ok(_) => tracing::debug!("Groups API returned no groups"),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load groups from API");
                last_error = Some(e);
            }
        }

        match self.fetch_groups_page().await {
            Ok(groups) if !groups.is_empty() => {
                tracing::info!(count = groups.len(), "Loaded groups from schedule page");
                return Ok(groups);
            }
            Ok(_) => {
                // An answered page with no groups is an empty listing
                tracing::warn!(
                    api_error = ?last_error.as_ref().map(ToString::to_string),
                    "Schedule page listed no groups"
                );
                last_error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load schedule page for groups");
                last_error = Some(e);
            }
        }

        if self.allow_group_guess {
            let guessed = self.guess_groups().await;
            if !guessed.is_empty() {
                tracing::info!(count = guessed.len(), "Discovered groups by probing");
                return Ok(guessed);
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(Vec::new()),
        }
    }
}
