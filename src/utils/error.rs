//! Error types for the upstream client, the day/pair mapper and persistence
//!
//! Upstream errors are `Clone` because a single failed fetch is handed to every
//! caller waiting on the same in-flight cache load.

use chrono::NaiveTime;
use thiserror::Error;

/// Errors that can occur while talking to the institution's schedule API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// Request did not complete within the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// Server answered with a non-success status code
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Response body could not be decoded into a schedule or roster
    #[error("Parse error: {0}")]
    Parse(String),

    /// Connection-level failure (DNS, TLS, refused, bind error)
    #[error("Transport error: {0}")]
    Transport(String),
}

impl UpstreamError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::HttpStatus(status) => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::HttpStatus(status.as_u16())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// User-input errors raised while translating day/time vocabulary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapperError {
    /// Neither a weekday name, a relative day, nor a supported date format
    #[error("Unrecognized day: {0}")]
    InvalidDay(String),

    /// Neither `HH:MM` nor a pair number
    #[error("Unrecognized time or pair: {0}")]
    InvalidTime(String),

    /// Clock time falls before the first pair, after the last, or in a break
    #[error("No pair is in progress at {0}")]
    NoPairAtTime(NaiveTime),

    /// Pair number outside `1..=max`
    #[error("Pair {requested} is out of range 1..={max}")]
    PairOutOfRange { requested: u32, max: u8 },
}

/// Errors raised by the persistence collaborator
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored document is not valid JSON for the expected type
    #[error("Invalid stored document {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
