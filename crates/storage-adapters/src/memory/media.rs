use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use domains::{DomainError, DomainResult, MediaStorage};

/// Keeps objects in memory; URLs use the `memory://` scheme.
#[derive(Default)]
pub struct MemoryMediaStorage {
    objects: DashMap<String, (Bytes, String)>,
}

impl MemoryMediaStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.objects.contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl MediaStorage for MemoryMediaStorage {
    async fn store(&self, key: &str, data: Bytes, content_type: &str) -> DomainResult<String> {
        self.objects
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(key.to_string())
    }

    async fn signed_url(&self, reference: &str, ttl: Duration) -> DomainResult<String> {
        if !self.objects.contains_key(reference) {
            return Err(DomainError::Storage(format!("no object stored under {reference}")));
        }
        let expires = chrono::Utc::now().timestamp() + ttl.as_secs() as i64;
        Ok(format!("memory://{reference}?expires={expires}"))
    }

    async fn delete(&self, reference: &str) -> DomainResult<()> {
        self.objects.remove(reference);
        Ok(())
    }
}
