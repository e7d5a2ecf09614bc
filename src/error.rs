//! Unified error handling for the freerooms crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while keeping the domain errors usable on
//! their own.
//!
//! # Architecture
//!
//! - [`FreeRoomsErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use freerooms::error::{Error, ErrorCategory, FreeRoomsErrorTrait};
//!
//! fn report(err: &Error) {
//!     if err.category() == ErrorCategory::Input {
//!         println!("{}", err.localized_desc());
//!     } else {
//!         eprintln!("{err}");
//!     }
//! }
//! ```

use thiserror::Error;

use crate::i18n::t;

// Re-export domain-specific errors for convenience
pub use crate::utils::error::{MapperError, StorageError, UpstreamError};

/// Common trait for all freerooms error types
pub trait FreeRoomsErrorTrait: std::error::Error {
    /// Check if this error is recoverable (the same call may succeed later)
    fn is_recoverable(&self) -> bool;

    /// Get localized description for user-facing messages
    fn localized_desc(&self) -> String;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Upstream unreachable, slow or refusing
    Network,
    /// Upstream answered with something unreadable
    Parsing,
    /// The user's day or time could not be understood
    Input,
    /// Persisted roster or catalog could not be read or written
    Storage,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get localized description for the category
    pub fn localized_desc(&self) -> String {
        match self {
            Self::Network => t!("errors.category.network").to_string(),
            Self::Parsing => t!("errors.category.parsing").to_string(),
            Self::Input => t!("errors.category.input").to_string(),
            Self::Storage => t!("errors.category.storage").to_string(),
            Self::Config => t!("errors.category.config").to_string(),
            Self::Other => t!("errors.category.other").to_string(),
        }
    }
}

impl FreeRoomsErrorTrait for UpstreamError {
    fn is_recoverable(&self) -> bool {
        self.is_retryable()
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Timeout => t!("errors.upstream.timeout").to_string(),
            Self::HttpStatus(status) => t!("errors.upstream.http_status", status = status).to_string(),
            Self::Parse(detail) => t!("errors.upstream.parse", detail = detail).to_string(),
            Self::Transport(detail) => t!("errors.upstream.transport", detail = detail).to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Parse(_) => ErrorCategory::Parsing,
            _ => ErrorCategory::Network,
        }
    }
}

impl FreeRoomsErrorTrait for MapperError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::InvalidDay(input) => t!("errors.mapper.invalid_day", input = input).to_string(),
            Self::InvalidTime(input) => t!("errors.mapper.invalid_time", input = input).to_string(),
            Self::NoPairAtTime(time) => {
                t!("errors.mapper.no_pair_at_time", time = time.format("%H:%M")).to_string()
            }
            Self::PairOutOfRange { requested, max } => {
                t!("errors.mapper.pair_out_of_range", requested = requested, max = max).to_string()
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Input
    }
}

impl FreeRoomsErrorTrait for StorageError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Io { path, .. } => t!("errors.storage.io", path = path).to_string(),
            Self::Corrupt { path, .. } => t!("errors.storage.corrupt", path = path).to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

/// Unified error type for the freerooms crate
#[derive(Error, Debug)]
pub enum Error {
    /// Upstream schedule API errors
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Day or time input errors
    #[error("Invalid input: {0}")]
    Mapper(#[from] MapperError),

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl FreeRoomsErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Upstream(e) => e.is_recoverable(),
            Self::Mapper(e) => e.is_recoverable(),
            Self::Storage(e) => e.is_recoverable(),
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Upstream(e) => e.localized_desc(),
            Self::Mapper(e) => e.localized_desc(),
            Self::Storage(e) => e.localized_desc(),
            Self::Config(msg) => format!("{}: {msg}", t!("errors.config.error")),
            Self::Other { context, .. } => context.clone(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Upstream(e) => e.category(),
            Self::Mapper(_) => ErrorCategory::Input,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
