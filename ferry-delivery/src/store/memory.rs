use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::ObjectStore;
use crate::error::StoreError;

type ObjectKey = (String, String);

/// In-memory object store
///
/// Backs tests and local runs. Failures can be injected per operation to
/// exercise the retry paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<ObjectKey, Vec<u8>>>>,
    failing_gets: Arc<RwLock<Option<String>>>,
    failing_deletes: Arc<RwLock<Option<String>>>,
    gets: Arc<AtomicUsize>,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: impl Into<String>, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .insert((bucket.into(), key.into()), data.into());
    }

    #[must_use]
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .read()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `get` calls served, successful or not
    #[must_use]
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::Relaxed)
    }

    /// Make every subsequent `get` fail with a backend error
    pub fn fail_gets(&self, reason: impl Into<String>) {
        *self.failing_gets.write() = Some(reason.into());
    }

    /// Make every subsequent `delete` fail with a backend error
    pub fn fail_deletes(&self, reason: impl Into<String>) {
        *self.failing_deletes.write() = Some(reason.into());
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.gets.fetch_add(1, Ordering::Relaxed);

        if let Some(reason) = self.failing_gets.read().clone() {
            return Err(StoreError::Backend(reason));
        }

        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        if let Some(reason) = self.failing_deletes.read().clone() {
            return Err(StoreError::Backend(reason));
        }

        // Deleting a missing object succeeds, as it does on S3
        self.objects
            .write()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
