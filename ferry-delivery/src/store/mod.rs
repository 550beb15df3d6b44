//! Object storage holding the raw messages.

mod memory;
mod s3;

use async_trait::async_trait;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

use crate::error::StoreError;

/// Where received messages wait for delivery.
///
/// Deleting an object is the commit of a delivery, so implementations must
/// only report `Ok` from [`delete`](Self::delete) once the object is gone.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the full object.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when the object does not exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Remove the object.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] if the store could not be reached.
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError>;
}
