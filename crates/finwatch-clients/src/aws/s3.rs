//! S3 object store.

use async_trait::async_trait;
use aws_config::SdkConfig;
use finwatch_abstraction::{ObjectStore, UpstreamError};
use tracing::debug;

use super::describe_sdk_error;

const SERVICE: &str = "s3";

/// Reads policy documents from S3.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    /// Creates an object store from a loaded SDK configuration.
    #[must_use]
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self { client: aws_sdk_s3::Client::new(sdk_config) }
    }

    /// Wraps an existing S3 client.
    #[must_use]
    pub const fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, UpstreamError> {
        let object = self.client.get_object().bucket(bucket).key(key).send().await.map_err(|e| {
            UpstreamError::unreachable(SERVICE, format!("s3://{bucket}/{key}: {}", describe_sdk_error(&e)))
        })?;

        let data = object.body.collect().await.map_err(|e| {
            UpstreamError::malformed(SERVICE, format!("s3://{bucket}/{key}: {e}"))
        })?;
        let bytes = data.into_bytes();

        debug!(bucket, key, size = bytes.len(), "Fetched object");
        Ok(bytes.to_vec())
    }
}
