//! Record stores.
//!
//! A [`Store`] persists one kind of [`Record`], keyed by the record's key and
//! searchable through the record's named indexes. Two backends are provided:
//!
//! - [`MemoryStore`] - `DashMap` backed, for tests and embedding
//! - [`JsonFileStore`] - one JSON document per record on disk

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use thiserror::Error;

/// A value that can be kept in a [`Store`].
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Model name, used for namespacing and in error messages.
    const MODEL: &'static str;

    /// Primary key.
    fn key(&self) -> &str;

    /// Values this record holds for `index`. Unknown indexes yield nothing,
    /// multi-valued indexes yield one entry per member.
    fn index_values(&self, index: &str) -> Vec<String>;
}

/// Errors returned by record stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record matched the key or index lookup
    #[error("{model} not found: {key}")]
    NotFound { model: &'static str, key: String },

    /// The key cannot be used as a storage key
    #[error("invalid {model} key: '{key}'")]
    InvalidKey { model: &'static str, key: String },

    /// IO error from a file-backed store
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A stored record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn not_found<T: Record>(key: impl Into<String>) -> Self {
        StoreError::NotFound {
            model: T::MODEL,
            key: key.into(),
        }
    }
}

/// Persistence for a single record type.
#[async_trait]
pub trait Store<T: Record>: Send + Sync {
    /// Insert a record, replacing any record stored under the same key.
    async fn save(&self, record: T) -> Result<T, StoreError>;

    /// Replace an existing record. Fails with `NotFound` if the key is absent.
    async fn update(&self, record: T) -> Result<T, StoreError>;

    /// Delete the record stored under `key`.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Fetch a record by key.
    async fn get(&self, key: &str) -> Result<Option<T>, StoreError>;

    /// All records holding `value` in `index`, ordered by key.
    async fn find(&self, index: &str, value: &str) -> Result<Vec<T>, StoreError>;

    /// First record holding `value` in `index`.
    async fn find_one(&self, index: &str, value: &str) -> Result<T, StoreError> {
        self.find(index, value)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found::<T>(format!("{}={}", index, value)))
    }
}

/// Whether `record` holds `value` in `index`.
pub(crate) fn matches_index<T: Record>(record: &T, index: &str, value: &str) -> bool {
    record.index_values(index).iter().any(|v| v == value)
}
