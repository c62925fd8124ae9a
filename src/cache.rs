//! Metadata cache boundary.
//!
//! The engine stores the final metadata of a run as JSON bytes under a
//! [`CacheKey`]. Storage is an external concern behind [`MetadataCache`];
//! [`InMemoryCache`] is the reference implementation.

use crate::types::RowMetadata;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Mutex;

/// Identifies the metadata of one preparation step of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub dataset_id: String,
    pub preparation_id: String,
    pub step_id: String,
}

impl CacheKey {
    pub fn new(
        dataset_id: impl Into<String>,
        preparation_id: impl Into<String>,
        step_id: impl Into<String>,
    ) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            preparation_id: preparation_id.into(),
            step_id: step_id.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "metadata/{}/{}/{}",
            self.dataset_id, self.preparation_id, self.step_id
        )
    }
}

/// Key → bytes store.
#[cfg_attr(test, mockall::automock)]
pub trait MetadataCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> io::Result<Option<Vec<u8>>>;
    fn put(&self, key: &CacheKey, value: Vec<u8>) -> io::Result<()>;
    fn evict(&self, key: &CacheKey) -> io::Result<()>;
}

/// Read and decode cached metadata
pub fn read_metadata(cache: &dyn MetadataCache, key: &CacheKey) -> io::Result<Option<RowMetadata>> {
    match cache.get(key)? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
        None => Ok(None),
    }
}

/// Encode and store metadata
pub fn write_metadata(
    cache: &dyn MetadataCache,
    key: &CacheKey,
    metadata: &RowMetadata,
) -> io::Result<()> {
    let bytes = serde_json::to_vec(metadata).map_err(io::Error::from)?;
    cache.put(key, bytes)
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataCache for InMemoryCache {
    fn get(&self, key: &CacheKey) -> io::Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(&key.to_string()).cloned())
    }

    fn put(&self, key: &CacheKey, value: Vec<u8>) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn evict(&self, key: &CacheKey) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(&key.to_string());
        Ok(())
    }
}
