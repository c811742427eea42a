use crate::keys::{join_url, parent_prefixes, temp_key, validate_key};
use crate::traits::{
    check_length, ArtifactWriter, ByteStream, Storage, StorageError, StorageResult, WriteReceipt,
};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, Method, StatusCode};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// WebDAV storage implementation
///
/// Artifacts are addressed on the DAV server under `{url}{base_path}/{key}` and
/// published under `{share_base_url}/{key}`.
#[derive(Clone)]
pub struct WebDavStorage {
    client: Client,
    dav_root: String,
    share_base_url: String,
    username: String,
    password: String,
    known_collections: Arc<Mutex<HashSet<String>>>,
}

impl WebDavStorage {
    /// Create a new WebDavStorage instance
    ///
    /// # Arguments
    /// * `url` - DAV endpoint (e.g., "https://dav.example.com/remote.php/dav/files/snap")
    /// * `base_path` - Directory on the server that holds the `snap/` tree
    /// * `share_base_url` - Public URL prefix the same tree is reachable under
    pub fn new(
        url: &str,
        base_path: &str,
        share_base_url: String,
        username: String,
        password: String,
    ) -> StorageResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let base_path = base_path.trim_matches('/');
        let dav_root = if base_path.is_empty() {
            url.trim_end_matches('/').to_string()
        } else {
            join_url(url, base_path)
        };

        Ok(WebDavStorage {
            client,
            dav_root,
            share_base_url,
            username,
            password,
            known_collections: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// URL of `key` on the DAV server
    pub fn dav_url(&self, key: &str) -> String {
        join_url(&self.dav_root, key)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    fn is_known_collection(&self, prefix: &str) -> bool {
        match self.known_collections.lock() {
            Ok(set) => set.contains(prefix),
            Err(poisoned) => poisoned.into_inner().contains(prefix),
        }
    }

    fn remember_collection(&self, prefix: String) {
        match self.known_collections.lock() {
            Ok(mut set) => {
                set.insert(prefix);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(prefix);
            }
        }
    }

    /// Create every missing parent collection of `key`.
    async fn ensure_collections(&self, key: &str) -> StorageResult<()> {
        let mkcol = dav_method(b"MKCOL")?;

        for prefix in parent_prefixes(key) {
            if self.is_known_collection(&prefix) {
                continue;
            }

            let url = self.dav_url(&prefix);
            let response = self
                .request(mkcol.clone(), &url)
                .send()
                .await
                .map_err(transport_error)?;

            // 405 Method Not Allowed: the collection already exists.
            match response.status() {
                StatusCode::CREATED | StatusCode::METHOD_NOT_ALLOWED => {
                    self.remember_collection(prefix);
                }
                status => {
                    return Err(StorageError::BackendError(format!(
                        "MKCOL {} returned {}",
                        url, status
                    )));
                }
            }
        }
        Ok(())
    }
}

fn dav_method(name: &'static [u8]) -> StorageResult<Method> {
    Method::from_bytes(name).map_err(|e| StorageError::ConfigError(e.to_string()))
}

fn transport_error(e: reqwest::Error) -> StorageError {
    if e.is_connect() || e.is_timeout() {
        StorageError::Unreachable(e.to_string())
    } else {
        StorageError::BackendError(e.to_string())
    }
}

#[async_trait]
impl Storage for WebDavStorage {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        let url = self.dav_url(key);

        let response = self
            .request(Method::HEAD, &url)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(StorageError::BackendError(format!(
                "HEAD {} returned {}",
                url, status
            ))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.share_base_url, key)
    }

    async fn open_write(
        &self,
        key: &str,
        content_type: &str,
        content_length: Option<u64>,
    ) -> StorageResult<Box<dyn ArtifactWriter>> {
        validate_key(key)?;
        self.ensure_collections(key).await?;

        Ok(Box::new(WebDavWriter {
            storage: self.clone(),
            temp_url: self.dav_url(&temp_key(key)),
            final_url: self.dav_url(key),
            key: key.to_string(),
            url: self.public_url(key),
            content_type: content_type.to_string(),
            content_length,
        }))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::WebDav
    }

    async fn health_check(&self) -> StorageResult<()> {
        let response = self
            .request(Method::OPTIONS, &self.dav_root)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StorageError::ConfigError(
                format!("WebDAV rejected credentials ({})", response.status()),
            )),
            status if status.is_server_error() => Err(StorageError::BackendError(format!(
                "OPTIONS {} returned {}",
                self.dav_root, status
            ))),
            _ => Ok(()),
        }
    }
}

struct WebDavWriter {
    storage: WebDavStorage,
    temp_url: String,
    final_url: String,
    key: String,
    url: String,
    content_type: String,
    content_length: Option<u64>,
}

impl WebDavWriter {
    async fn upload_temp(&self, stream: ByteStream) -> StorageResult<u64> {
        let counter = Arc::new(AtomicU64::new(0));
        let counted = {
            let counter = counter.clone();
            stream.map(move |chunk| {
                if let Ok(ref bytes) = chunk {
                    counter.fetch_add(bytes.len() as u64, Ordering::Relaxed);
                }
                chunk
            })
        };

        let mut request = self
            .storage
            .request(Method::PUT, &self.temp_url)
            .header(header::CONTENT_TYPE, &self.content_type)
            .body(reqwest::Body::wrap_stream(counted));
        if let Some(length) = self.content_length {
            request = request.header(header::CONTENT_LENGTH, length);
        }

        let response = request.send().await.map_err(|e| {
            StorageError::UploadFailed(format!("PUT {} failed: {}", self.temp_url, e))
        })?;

        if !response.status().is_success() {
            return Err(StorageError::UploadFailed(format!(
                "PUT {} returned {}",
                self.temp_url,
                response.status()
            )));
        }

        let written = counter.load(Ordering::Relaxed);
        check_length(&self.key, self.content_length, written)?;
        Ok(written)
    }

    async fn promote(&self) -> StorageResult<()> {
        let response = self
            .storage
            .request(dav_method(b"MOVE")?, &self.temp_url)
            .header("Destination", &self.final_url)
            .header("Overwrite", "T")
            .send()
            .await
            .map_err(|e| {
                StorageError::UploadFailed(format!("MOVE {} failed: {}", self.temp_url, e))
            })?;

        if !response.status().is_success() {
            return Err(StorageError::UploadFailed(format!(
                "MOVE {} -> {} returned {}",
                self.temp_url,
                self.final_url,
                response.status()
            )));
        }
        Ok(())
    }

    async fn discard_temp(&self) {
        let result = self
            .storage
            .request(Method::DELETE, &self.temp_url)
            .send()
            .await;
        if let Err(e) = result {
            tracing::warn!(url = %self.temp_url, error = %e, "Failed to remove partial upload");
        }
    }
}

#[async_trait]
impl ArtifactWriter for WebDavWriter {
    async fn write_stream(self: Box<Self>, stream: ByteStream) -> StorageResult<WriteReceipt> {
        let start = std::time::Instant::now();

        let result = match self.upload_temp(stream).await {
            Ok(written) => self.promote().await.map(|_| written),
            Err(e) => Err(e),
        };

        let written = match result {
            Ok(written) => written,
            Err(e) => {
                self.discard_temp().await;
                return Err(e);
            }
        };

        tracing::info!(
            key = %self.key,
            url = %self.final_url,
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "WebDAV stream upload successful"
        );

        Ok(WriteReceipt {
            key: self.key.clone(),
            url: self.url.clone(),
            bytes_written: written,
        })
    }
}

#[cfg(all(test, feature = "storage-webdav"))]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;
    use mockito::Matcher;
    use std::io;

    /// `user:secret`
    const BASIC_AUTH: &str = "Basic dXNlcjpzZWNyZXQ=";
    const SHARE_URL: &str = "https://share.example.com/s";

    fn dav_storage(server: &mockito::Server) -> WebDavStorage {
        WebDavStorage::new(
            &server.url(),
            "/",
            SHARE_URL.to_string(),
            "user".to_string(),
            "secret".to_string(),
        )
        .unwrap()
    }

    fn partial_of(path: &str) -> Matcher {
        Matcher::Regex(format!(r"^{}\.partial-[0-9a-f]{{32}}$", regex_escape(path)))
    }

    fn regex_escape(path: &str) -> String {
        path.replace('.', r"\.")
    }

    fn chunks(parts: &[&'static [u8]]) -> ByteStream {
        let items: Vec<io::Result<Bytes>> =
            parts.iter().map(|p| Ok(Bytes::from_static(p))).collect();
        Box::pin(stream::iter(items))
    }

    async fn mock_collections(server: &mut mockito::Server) -> (mockito::Mock, mockito::Mock) {
        let snap = server
            .mock("MKCOL", "/snap")
            .match_header("authorization", BASIC_AUTH)
            .with_status(201)
            .expect(1)
            .create_async()
            .await;
        // Already exists.
        let team = server
            .mock("MKCOL", "/snap/teamA")
            .with_status(405)
            .expect(1)
            .create_async()
            .await;
        (snap, team)
    }

    #[tokio::test]
    async fn test_exists_maps_head_status() {
        let mut server = mockito::Server::new_async().await;
        let found = server
            .mock("HEAD", "/snap/teamA/1.png")
            .match_header("authorization", BASIC_AUTH)
            .with_status(200)
            .create_async()
            .await;
        let missing = server
            .mock("HEAD", "/snap/teamA/1.mp4")
            .with_status(404)
            .create_async()
            .await;
        let broken = server
            .mock("HEAD", "/snap/teamA/2.png")
            .with_status(500)
            .create_async()
            .await;
        let storage = dav_storage(&server);

        assert!(storage.exists("snap/teamA/1.png").await.unwrap());
        assert!(!storage.exists("snap/teamA/1.mp4").await.unwrap());
        assert!(matches!(
            storage.exists("snap/teamA/2.png").await,
            Err(StorageError::BackendError(_))
        ));

        found.assert_async().await;
        missing.assert_async().await;
        broken.assert_async().await;
    }

    #[tokio::test]
    async fn test_write_puts_temp_then_moves_into_place() {
        let mut server = mockito::Server::new_async().await;
        let (snap, team) = mock_collections(&mut server).await;
        let put = server
            .mock("PUT", partial_of("/snap/teamA/1.png"))
            .match_header("authorization", BASIC_AUTH)
            .match_header("content-type", "image/png")
            .match_body("hello world")
            .with_status(201)
            .expect(1)
            .create_async()
            .await;
        let moved = server
            .mock("MOVE", partial_of("/snap/teamA/1.png"))
            .match_header("destination", format!("{}/snap/teamA/1.png", server.url()).as_str())
            .match_header("overwrite", "T")
            .with_status(201)
            .expect(1)
            .create_async()
            .await;
        let storage = dav_storage(&server);

        let writer = storage
            .open_write("snap/teamA/1.png", "image/png", Some(11))
            .await
            .unwrap();
        let receipt = writer
            .write_stream(chunks(&[b"hello ", b"world"]))
            .await
            .unwrap();

        assert_eq!(receipt.key, "snap/teamA/1.png");
        assert_eq!(receipt.url, format!("{}/snap/teamA/1.png", SHARE_URL));
        assert_eq!(receipt.bytes_written, 11);
        snap.assert_async().await;
        team.assert_async().await;
        put.assert_async().await;
        moved.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_put_discards_temp_and_never_moves() {
        let mut server = mockito::Server::new_async().await;
        let _collections = mock_collections(&mut server).await;
        let put = server
            .mock("PUT", partial_of("/snap/teamA/1.mp4"))
            .with_status(507)
            .expect(1)
            .create_async()
            .await;
        let moved = server
            .mock("MOVE", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let deleted = server
            .mock("DELETE", partial_of("/snap/teamA/1.mp4"))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;
        let storage = dav_storage(&server);

        let writer = storage
            .open_write("snap/teamA/1.mp4", "video/mp4", None)
            .await
            .unwrap();
        let result = writer.write_stream(chunks(&[b"frames"])).await;

        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
        put.assert_async().await;
        moved.assert_async().await;
        deleted.assert_async().await;
    }

    #[tokio::test]
    async fn test_collections_created_once() {
        let mut server = mockito::Server::new_async().await;
        let (snap, team) = mock_collections(&mut server).await;
        let storage = dav_storage(&server);

        let _first = storage.open_write("snap/teamA/1.png", "image/png", None).await.unwrap();
        let _second = storage.open_write("snap/teamA/2.png", "image/png", None).await.unwrap();

        snap.assert_async().await;
        team.assert_async().await;
    }

    fn storage(base_path: &str) -> WebDavStorage {
        WebDavStorage::new(
            "https://dav.example.com/remote.php/dav/",
            base_path,
            "https://share.example.com/s/".to_string(),
            "user".to_string(),
            "secret".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_url_composition() {
        let storage = storage("/");
        assert_eq!(
            storage.dav_url("snap/teamA/1.png"),
            "https://dav.example.com/remote.php/dav/snap/teamA/1.png"
        );
        assert_eq!(
            storage.public_url("snap/teamA/1.png"),
            "https://share.example.com/s/snap/teamA/1.png"
        );
        assert_eq!(storage.backend_type(), StorageBackend::WebDav);
    }

    #[test]
    fn test_base_path_prefixes_dav_url() {
        let storage = storage("/media/");
        assert_eq!(
            storage.dav_url("snap/teamA/1.png"),
            "https://dav.example.com/remote.php/dav/media/snap/teamA/1.png"
        );
        assert_eq!(
            storage.public_url("snap/teamA/1.png"),
            "https://share.example.com/s/snap/teamA/1.png"
        );
    }

    #[test]
    fn test_collection_cache() {
        let storage = storage("/");
        assert!(!storage.is_known_collection("snap"));
        storage.remember_collection("snap".to_string());
        assert!(storage.is_known_collection("snap"));
        assert!(storage.clone().is_known_collection("snap"));
    }

    #[tokio::test]
    async fn test_invalid_key_rejected_before_network() {
        let storage = storage("/");
        let result = storage.exists("../secret").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
