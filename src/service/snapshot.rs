//! Process-wide values replaced atomically

use std::sync::Arc;
use tokio::sync::RwLock;

/// A shared value that readers clone cheaply and writers swap whole
///
/// Readers holding an older `Arc` keep a consistent view while a refresh
/// installs the next one.
#[derive(Debug)]
pub struct Snapshot<T> {
    current: RwLock<Arc<T>>,
}

impl<T> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    /// The value installed most recently
    pub async fn load(&self) -> Arc<T> {
        Arc::clone(&*self.current.read().await)
    }

    /// Install `value`, returning the previous one
    pub async fn replace(&self, value: T) -> Arc<T> {
        let mut current = self.current.write().await;
        std::mem::replace(&mut *current, Arc::new(value))
    }
}

impl<T: Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
