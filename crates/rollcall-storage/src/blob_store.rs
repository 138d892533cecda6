// Blob store backends for rendered certificates
//
// FsBlobStore   - files under a local root, served by the API under /files
// HttpBlobStore - PUT to an object gateway, public URL derived from the key

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use rollcall_core::{traits::BlobStore, BlobError};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

/// Reject keys that could escape the store root
fn validate_key(key: &str) -> Result<&Path, BlobError> {
    let path = Path::new(key);
    let safe = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if safe {
        Ok(path)
    } else {
        Err(BlobError::PermissionDenied(key.to_string()))
    }
}

fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}

async fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(tmp, path).await
}

// ============================================================================
// FsBlobStore - Local directory
// ============================================================================

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root_dir: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    /// Create a store rooted at `root_dir`, creating it if needed
    pub async fn new(
        root_dir: impl AsRef<Path>,
        public_base_url: impl Into<String>,
    ) -> Result<Self, BlobError> {
        let root_dir = root_dir.as_ref().to_path_buf();
        fs::create_dir_all(&root_dir).await?;

        info!(path = %root_dir.display(), "Initialized blob store");

        Ok(Self {
            root_dir,
            public_base_url: public_base_url.into(),
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, BlobError> {
        Ok(self.root_dir.join(validate_key(key)?))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), BlobError> {
        let path = self.blob_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a sibling temp file and rename so readers never see a partial PDF
        let tmp = path.with_extension(format!("{}.tmp", Uuid::now_v7().simple()));
        if let Err(e) = write_then_rename(&tmp, &path, &bytes).await {
            if let Err(cleanup) = fs::remove_file(&tmp).await {
                debug!(path = %tmp.display(), error = %cleanup, "Temp blob not removed");
            }
            return Err(e.into());
        }

        debug!(key, size = bytes.len(), "Stored blob");
        Ok(())
    }

    async fn url(&self, key: &str) -> Result<String, BlobError> {
        let path = self.blob_path(key)?;
        if fs::metadata(&path).await.is_err() {
            return Err(BlobError::NotFound(key.to_string()));
        }
        Ok(join_url(&self.public_base_url, key))
    }
}

// ============================================================================
// HttpBlobStore - Object gateway over HTTP
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    endpoint: String,
    public_base_url: String,
    token: Option<String>,
}

impl HttpBlobStore {
    pub fn new(endpoint: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            public_base_url: public_base_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BlobError> {
        validate_key(key)?;
        let size = bytes.len();

        let mut request = self
            .client
            .put(join_url(&self.endpoint, key))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| BlobError::Upload {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(BlobError::PermissionDenied(key.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BlobError::Upload {
                key: key.to_string(),
                reason: format!("gateway returned {status}: {body}"),
            });
        }

        debug!(key, size, "Uploaded blob");
        Ok(())
    }

    async fn url(&self, key: &str) -> Result<String, BlobError> {
        validate_key(key)?;
        Ok(join_url(&self.public_base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fs_put_and_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "http://localhost:8080/files/")
            .await
            .unwrap();

        store
            .put("pdfs/U1-abc-attendance.pdf", b"%PDF".to_vec(), "application/pdf")
            .await
            .unwrap();

        let on_disk = std::fs::read(dir.path().join("pdfs/U1-abc-attendance.pdf")).unwrap();
        assert_eq!(on_disk, b"%PDF");
        assert_eq!(
            store.url("pdfs/U1-abc-attendance.pdf").await.unwrap(),
            "http://localhost:8080/files/pdfs/U1-abc-attendance.pdf"
        );

        // Only the final file remains
        let entries = std::fs::read_dir(dir.path().join("pdfs")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_fs_failed_put_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "/files").await.unwrap();
        // A directory at the target path makes the final rename fail
        std::fs::create_dir_all(dir.path().join("pdfs/taken.pdf")).unwrap();

        let result = store.put("pdfs/taken.pdf", b"%PDF".to_vec(), "application/pdf").await;

        assert!(result.is_err());
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("pdfs"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("taken.pdf")]);
    }

    #[tokio::test]
    async fn test_fs_url_for_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "/files").await.unwrap();
        assert!(matches!(
            store.url("pdfs/missing.pdf").await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fs_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path(), "/files").await.unwrap();
        for key in ["../outside.pdf", "/etc/passwd", "pdfs/../../x.pdf", ""] {
            let err = store.put(key, vec![1], "application/pdf").await.unwrap_err();
            assert_eq!(err.kind(), "permission_denied", "key {key:?}");
        }
    }

    #[tokio::test]
    async fn test_http_put_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/bucket/pdfs/U1-attendance.pdf"))
            .and(header("authorization", "Bearer secret"))
            .and(header("content-type", "application/pdf"))
            .and(body_bytes(b"%PDF".to_vec()))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpBlobStore::new(
            format!("{}/bucket", server.uri()),
            "https://cdn.example.edu/certs",
        )
        .with_token("secret");

        store
            .put("pdfs/U1-attendance.pdf", b"%PDF".to_vec(), "application/pdf")
            .await
            .unwrap();
        assert_eq!(
            store.url("pdfs/U1-attendance.pdf").await.unwrap(),
            "https://cdn.example.edu/certs/pdfs/U1-attendance.pdf"
        );
    }

    #[tokio::test]
    async fn test_http_permission_denied() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let store = HttpBlobStore::new(server.uri(), "https://cdn.example.edu");
        let err = store
            .put("pdfs/a.pdf", vec![1], "application/pdf")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "permission_denied");
    }

    #[tokio::test]
    async fn test_http_server_error_is_upload_failure() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let store = HttpBlobStore::new(server.uri(), "https://cdn.example.edu");
        let err = store
            .put("pdfs/a.pdf", vec![1], "application/pdf")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "upload");
        assert!(err.to_string().contains("503"));
    }
}
