//! Persistence for the group roster and the rooms catalog
//!
//! Each persisted value is a [`Collection`]: a single document that is loaded
//! whole and replaced whole. Two backends are provided:
//!
//! - [`JsonFileStore`] - one pretty-printed JSON file, written atomically
//! - [`MemoryStore`] - process memory, for tests and ephemeral runs

mod json;

pub use json::JsonFileStore;

use std::sync::{Arc, Mutex, PoisonError};

use crate::utils::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A single persisted document of type `T`
pub trait Collection<T>: Send + Sync {
    /// Load the stored value; `Ok(None)` when nothing has been saved yet
    fn load(&self) -> StorageResult<Option<T>>;

    /// Replace the stored value
    fn save(&self, value: &T) -> StorageResult<()>;
}

impl<T, C: Collection<T> + ?Sized> Collection<T> for Arc<C> {
    fn load(&self) -> StorageResult<Option<T>> {
        (**self).load()
    }

    fn save(&self, value: &T) -> StorageResult<()> {
        (**self).save(value)
    }
}

/// In-memory collection
#[derive(Debug, Default)]
pub struct MemoryStore<T> {
    value: Mutex<Option<T>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    /// Create a store that already holds `value`
    pub fn with_value(value: T) -> Self {
        Self {
            value: Mutex::new(Some(value)),
        }
    }
}

impl<T: Clone + Send> Collection<T> for MemoryStore<T> {
    fn load(&self) -> StorageResult<Option<T>> {
        Ok(self
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, value: &T) -> StorageResult<()> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.clone());
        Ok(())
    }
}
