// Artifact store adapter
//
// Chooses a unique key for every rendered PDF, uploads it through the
// configured BlobStore under the store retry policy, and returns the URL.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use crate::error::{BlobError, StoreError};
use crate::retry::RetryPolicy;
use crate::traits::BlobStore;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A stored artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub key: String,
    pub url: String,
    /// Hex SHA-256 of the uploaded bytes
    pub sha256: String,
    pub size: usize,
}

#[derive(Clone)]
pub struct ArtifactStore {
    blobs: Arc<dyn BlobStore>,
    prefix: String,
    retry: RetryPolicy,
}

impl ArtifactStore {
    pub fn new(blobs: Arc<dyn BlobStore>, prefix: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            blobs,
            prefix: prefix.into(),
            retry,
        }
    }

    /// Upload `bytes` for `user_id` and return the durable URL
    ///
    /// A fresh key is generated per call; retries reuse it so a retried
    /// upload overwrites its own partial attempt and nothing else.
    pub async fn store(&self, bytes: Vec<u8>, user_id: &str) -> Result<StoredArtifact, StoreError> {
        let key = storage_key(&self.prefix, user_id);
        let sha256 = hex::encode(Sha256::digest(&bytes));
        let size = bytes.len();

        let blobs = &self.blobs;
        let key_ref = key.as_str();
        let bytes_ref = &bytes;
        let url = self
            .retry
            .run("artifact_store", BlobError::kind, move || async move {
                blobs
                    .put(key_ref, bytes_ref.clone(), PDF_CONTENT_TYPE)
                    .await?;
                blobs.url(key_ref).await
            })
            .await
            .map_err(|(source, attempts)| StoreError { attempts, source })?;

        debug!(key = %key, sha256 = %sha256, size, "Stored certificate artifact");
        Ok(StoredArtifact {
            key,
            url,
            sha256,
            size,
        })
    }
}

/// `{prefix}/{sanitized user id}-{uuid v7}-attendance.pdf`
pub fn storage_key(prefix: &str, user_id: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let key = format!("{}-{}-attendance.pdf", sanitize(user_id), Uuid::now_v7());
    if prefix.is_empty() {
        key
    } else {
        format!("{prefix}/{key}")
    }
}

fn sanitize(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBlobStore;
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    fn test_storage_key_format() {
        let key = storage_key("pdfs", "U1");
        assert!(key.starts_with("pdfs/U1-"));
        assert!(key.ends_with("-attendance.pdf"));
    }

    #[test]
    fn test_storage_key_sanitizes_user_id() {
        let key = storage_key("/pdfs/", "../etc/passwd");
        assert!(key.starts_with("pdfs/___etc_passwd-"));
        assert_eq!(key.matches('/').count(), 1);
    }

    #[test]
    fn test_storage_keys_never_collide() {
        let keys: HashSet<String> = (0..1000).map(|_| storage_key("pdfs", "U1")).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[tokio::test]
    async fn test_store_uploads_and_returns_url() {
        let blobs = InMemoryBlobStore::new();
        let store = ArtifactStore::new(Arc::new(blobs.clone()), "pdfs", RetryPolicy::no_retry());

        let artifact = store.store(b"%PDF-1.5".to_vec(), "U1").await.unwrap();

        assert_eq!(artifact.url, format!("memory://{}", artifact.key));
        assert_eq!(artifact.size, 8);
        assert_eq!(artifact.sha256.len(), 64);
        assert_eq!(blobs.get(&artifact.key).await.unwrap(), b"%PDF-1.5".to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_retries_transient_failures() {
        let blobs = InMemoryBlobStore::new();
        blobs.fail_next_puts(2).await;
        let store = ArtifactStore::new(
            Arc::new(blobs.clone()),
            "pdfs",
            RetryPolicy::fixed(Duration::from_millis(50), 3),
        );

        let artifact = store.store(b"pdf".to_vec(), "U1").await.unwrap();
        assert_eq!(blobs.len().await, 1);
        assert!(blobs.get(&artifact.key).await.is_some());
    }

    #[tokio::test]
    async fn test_store_reports_attempts_on_failure() {
        let blobs = InMemoryBlobStore::new();
        blobs.fail_next_puts(5).await;
        let store = ArtifactStore::new(
            Arc::new(blobs.clone()),
            "pdfs",
            RetryPolicy::fixed(Duration::ZERO, 2),
        );

        let err = store.store(b"pdf".to_vec(), "U1").await.unwrap_err();
        assert_eq!(err.attempts, 2);
        assert_eq!(blobs.len().await, 0);
    }
}
