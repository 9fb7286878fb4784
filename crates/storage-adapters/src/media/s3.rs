//! S3 implementation of `MediaStorage`: objects are private, reads go
//! through presigned GET URLs.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use domains::{DomainError, DomainResult, MediaStorage};
use tracing::debug;

pub struct S3MediaStorage {
    client: Client,
    bucket: String,
}

impl S3MediaStorage {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Builds a client from the standard AWS environment / profile chain.
    pub async fn from_env(bucket: impl Into<String>, region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = loader.load().await;
        Self::new(Client::new(&config), bucket)
    }
}

fn storage_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::Storage(e.to_string())
}

#[async_trait]
impl MediaStorage for S3MediaStorage {
    async fn store(&self, key: &str, data: Bytes, content_type: &str) -> DomainResult<String> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(storage_err)?;
        debug!(bucket = %self.bucket, key, bytes = len, "object uploaded");
        Ok(key.to_string())
    }

    async fn signed_url(&self, reference: &str, ttl: Duration) -> DomainResult<String> {
        let config = PresigningConfig::expires_in(ttl).map_err(storage_err)?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(reference)
            .presigned(config)
            .await
            .map_err(storage_err)?;
        Ok(request.uri().to_string())
    }

    async fn delete(&self, reference: &str) -> DomainResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(reference)
            .send()
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}
