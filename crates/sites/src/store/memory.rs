//! In-memory record store.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

use super::{matches_index, Record, Store, StoreError};

/// In-memory store keyed by record key.
///
/// Clones share the same underlying map.
#[derive(Debug)]
pub struct MemoryStore<T> {
    records: Arc<DashMap<String, T>>,
}

impl<T: Record> MemoryStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

#[async_trait]
impl<T: Record> Store<T> for MemoryStore<T> {
    async fn save(&self, record: T) -> Result<T, StoreError> {
        trace!(model = T::MODEL, key = %record.key(), "Saving record");
        self.records
            .insert(record.key().to_string(), record.clone());
        Ok(record)
    }

    async fn update(&self, record: T) -> Result<T, StoreError> {
        match self.records.get_mut(record.key()) {
            Some(mut existing) => {
                trace!(model = T::MODEL, key = %record.key(), "Updating record");
                *existing = record.clone();
                Ok(record)
            }
            None => Err(StoreError::not_found::<T>(record.key())),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self.records.remove(key) {
            Some(_) => {
                trace!(model = T::MODEL, key = %key, "Deleted record");
                Ok(())
            }
            None => Err(StoreError::not_found::<T>(key)),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    async fn find(&self, index: &str, value: &str) -> Result<Vec<T>, StoreError> {
        let mut found: Vec<T> = self
            .records
            .iter()
            .filter(|entry| matches_index(entry.value(), index, value))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.key().cmp(b.key()));

        trace!(
            model = T::MODEL,
            index = %index,
            value = %value,
            matches = found.len(),
            "Index lookup"
        );
        Ok(found)
    }
}
