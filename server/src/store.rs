//! Key/value store abstraction for persisted sessions and events.
//!
//! The server never owns a storage engine. Route handlers reach the backend
//! through the [`Store`] trait, which is injected into the application state
//! as an `Arc<dyn Store>`. Records are stored as JSON text keyed by strings;
//! the key layout is defined in [`crate::models`].
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`. Single-key `save` and `load` are
//! expected to be atomic; the server never relies on cross-key transactions.
//!
//! # Example
//!
//! ```rust
//! use eventrelay_server::store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! store.save("session:abc", r#"{"id":"abc","key":"secret"}"#).unwrap();
//!
//! assert!(store.load("session:abc").unwrap().is_some());
//! assert!(store.load("session:missing").unwrap().is_none());
//! ```

use std::collections::BTreeMap;
use std::sync::RwLock;

use thiserror::Error;
use tracing::trace;

/// Errors raised by a [`Store`] backend or while (de)serializing records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not complete the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded.
    #[error("corrupt record at '{key}': {reason}")]
    Corrupt {
        /// Storage key of the unreadable record.
        key: String,
        /// Decoder error message.
        reason: String,
    },

    /// A record could not be encoded for storage.
    #[error("failed to serialize record: {0}")]
    Serialize(String),
}

impl StoreError {
    /// Creates an error for a backend that could not serve the request.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates an error for a record that failed to decode.
    pub fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Persistent key/value backend consumed by the server.
pub trait Store: Send + Sync {
    /// Inserts or replaces the value stored under `key`.
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Returns the value stored under `key`, or `None` if there is none.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Returns every key starting with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// In-process [`Store`] backed by an ordered map.
///
/// This is the default backend for the binary and the fake used in tests.
/// Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::unavailable("memory store lock poisoned"))?;
        records.insert(key.to_string(), value.to_string());
        trace!(key = %key, "Saved record");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::unavailable("memory store lock poisoned"))?;
        Ok(records.get(key).cloned())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::unavailable("memory store lock poisoned"))?;
        Ok(records
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
