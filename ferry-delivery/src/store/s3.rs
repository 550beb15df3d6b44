use async_trait::async_trait;
use aws_sdk_s3::{Client, error::DisplayErrorContext};

use super::ObjectStore;
use crate::error::StoreError;

/// [`ObjectStore`] over Amazon S3
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StoreError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StoreError::Backend(DisplayErrorContext(&service_error).to_string())
                }
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Backend(format!("Reading object body: {e}")))?;

        Ok(body.into_bytes().to_vec())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::Backend(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}
