//! Local filesystem implementation of `MediaStorage`.
//!
//! Objects are written below `root` at a sharded path derived from the
//! SHA-256 of their key. URLs are signed with HMAC-SHA256 over
//! `"<key>\n<expires>"` and checked by `verify` before serving.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use domains::{DomainError, DomainResult, MediaStorage};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

pub struct LocalMediaStorage {
    /// Root directory for all uploads (e.g., "./data/media")
    root_path: PathBuf,
    /// Public URL prefix the API serves objects under (e.g., "/media")
    url_prefix: String,
    signing_key: Vec<u8>,
}

impl LocalMediaStorage {
    pub fn new(root: PathBuf, url_prefix: String, signing_key: &[u8]) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            signing_key: signing_key.to_vec(),
        }
    }

    /// Generates a sharded path: "ab/cd/<sha256(key)>.<ext>"
    fn sharded_path(&self, key: &str) -> PathBuf {
        let hash = hex::encode(Sha256::digest(key.as_bytes()));
        let ext = Path::new(key)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin");

        let mut path = self.root_path.clone();
        path.push(&hash[0..2]);
        path.push(&hash[2..4]);
        path.push(format!("{hash}.{ext}"));
        path
    }

    fn mac(&self, key: &str, expires: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    fn signature(&self, key: &str, expires: i64) -> String {
        hex::encode(self.mac(key, expires).finalize().into_bytes())
    }

    /// Checks a signature produced by `signed_url` and that it has not
    /// expired at `now` (unix seconds).
    pub fn verify(&self, key: &str, expires: i64, signature: &str, now: i64) -> bool {
        if expires < now {
            return false;
        }
        let Ok(sig) = hex::decode(signature) else {
            return false;
        };
        self.mac(key, expires).verify_slice(&sig).is_ok()
    }

    /// Reads an object back for serving.
    pub async fn read(&self, key: &str) -> DomainResult<Bytes> {
        let data = fs::read(self.sharded_path(key))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => DomainError::not_found("Media", key),
                _ => DomainError::Storage(e.to_string()),
            })?;
        Ok(Bytes::from(data))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn store(&self, key: &str, data: Bytes, _content_type: &str) -> DomainResult<String> {
        let target = self.sharded_path(key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Storage(e.to_string()))?;
        }
        fs::write(&target, &data)
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        debug!(key, path = %target.display(), bytes = data.len(), "object written");
        Ok(key.to_string())
    }

    async fn signed_url(&self, reference: &str, ttl: Duration) -> DomainResult<String> {
        let ttl = i64::try_from(ttl.as_secs())
            .map_err(|_| DomainError::Storage("URL lifetime out of range".into()))?;
        let expires = chrono::Utc::now().timestamp() + ttl;
        Ok(format!(
            "{}/{}?expires={}&signature={}",
            self.url_prefix,
            reference,
            expires,
            self.signature(reference, expires)
        ))
    }

    async fn delete(&self, reference: &str) -> DomainResult<()> {
        match fs::remove_file(self.sharded_path(reference)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Storage(e.to_string())),
        }
    }
}
