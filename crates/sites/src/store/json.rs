//! File-backed record store.
//!
//! # Directory Structure
//!
//! ```text
//! db/
//! └── site/
//!     ├── alice.static.land.json
//!     └── example.com.json
//! ```
//!
//! Each record is one pretty-printed JSON document named after its key.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! crash never leaves a truncated record behind. Index lookups scan the
//! model directory.

use async_trait::async_trait;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use super::{matches_index, Record, Store, StoreError};

/// JSON-file store rooted at a base directory.
#[derive(Debug)]
pub struct JsonFileStore<T> {
    /// Directory holding this model's documents
    model_path: PathBuf,
    /// Serializes writers within this process
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> JsonFileStore<T> {
    /// Open (creating if needed) a store under `base_path`.
    ///
    /// Directories are created with 0700 permissions on Unix.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or permissions
    /// cannot be set.
    pub fn new(base_path: &Path) -> Result<Self, StoreError> {
        let model_path = base_path.join(T::MODEL);
        fs::create_dir_all(&model_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(base_path, perms.clone())?;
            fs::set_permissions(&model_path, perms)?;
        }

        info!(
            model = T::MODEL,
            storage_path = %model_path.display(),
            "Initialized record storage"
        );

        Ok(Self {
            model_path,
            write_lock: Mutex::new(()),
            _record: PhantomData,
        })
    }

    /// Directory this store writes documents into
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn record_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains(['/', '\\', '\0']);
        if !valid {
            return Err(StoreError::InvalidKey {
                model: T::MODEL,
                key: key.to_string(),
            });
        }
        Ok(self.model_path.join(format!("{}.json", key)))
    }

    async fn read_record(path: &Path) -> Result<Option<T>, StoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_record(&self, path: &Path, record: &T) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(record)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<T>, StoreError> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.model_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(StoreError::Serialization(e)) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable record");
                }
                Err(e) => return Err(e),
            }
        }

        records.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(records)
    }
}

#[async_trait]
impl<T: Record> Store<T> for JsonFileStore<T> {
    async fn save(&self, record: T) -> Result<T, StoreError> {
        let path = self.record_path(record.key())?;
        let _guard = self.write_lock.lock().await;
        self.write_record(&path, &record).await?;
        debug!(model = T::MODEL, key = %record.key(), "Saved record");
        Ok(record)
    }

    async fn update(&self, record: T) -> Result<T, StoreError> {
        let path = self.record_path(record.key())?;
        let _guard = self.write_lock.lock().await;
        if !tokio::fs::try_exists(&path).await? {
            return Err(StoreError::not_found::<T>(record.key()));
        }
        self.write_record(&path, &record).await?;
        debug!(model = T::MODEL, key = %record.key(), "Updated record");
        Ok(record)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.record_path(key)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(model = T::MODEL, key = %key, "Deleted record");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::not_found::<T>(key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.record_path(key)?;
        Self::read_record(&path).await
    }

    async fn find(&self, index: &str, value: &str) -> Result<Vec<T>, StoreError> {
        let found: Vec<T> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|record| matches_index(record, index, value))
            .collect();

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
