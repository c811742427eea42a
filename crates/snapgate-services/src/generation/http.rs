use std::io;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{header, Client};
use snapgate_core::ResourceKey;

use super::{GenerationError, GenerationResult, SnapGenerator};

/// Client for the snapshot backend: `GET {base_url}/twitter/{id}`.
#[derive(Clone)]
pub struct HttpSnapGenerator {
    http_client: Client,
    base_url: String,
}

impl HttpSnapGenerator {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GenerationError> {
        // The gateway bounds the wait for the response head; bodies are not time limited.
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GenerationError::Config(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    pub fn snap_url(&self, id: &str) -> String {
        format!("{}/twitter/{}", self.base_url.trim_end_matches('/'), id)
    }
}

#[async_trait]
impl SnapGenerator for HttpSnapGenerator {
    #[tracing::instrument(skip(self), fields(resource = %key))]
    async fn generate(&self, key: &ResourceKey) -> Result<GenerationResult, GenerationError> {
        let url = self.snap_url(key.id());

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| GenerationError::UnsupportedContentType("<missing>".to_string()))?;

        let result = GenerationResult {
            content_length: response.content_length(),
            stream: Box::pin(response.bytes_stream().map_err(io::Error::other)),
            content_type,
        };
        result.encoding()?;

        tracing::debug!(
            content_type = %result.content_type,
            content_length = ?result.content_length,
            "Generation started"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_snap_url() {
        let generator = HttpSnapGenerator::new("http://snap.internal/").unwrap();
        assert_eq!(generator.snap_url("123"), "http://snap.internal/twitter/123");
    }

    async fn generate_from(server: &mockito::Server) -> Result<GenerationResult, GenerationError> {
        let generator = HttpSnapGenerator::new(server.url()).unwrap();
        let key = ResourceKey::new("teamA", "1").unwrap();
        generator.generate(&key).await
    }

    #[tokio::test]
    async fn test_non_success_status_carries_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/twitter/1")
            .with_status(500)
            .with_body("renderer crashed")
            .create_async()
            .await;

        match generate_from(&server).await {
            Err(GenerationError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "renderer crashed");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a status error"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unsupported_content_type_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/twitter/1")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html></html>")
            .create_async()
            .await;

        match generate_from(&server).await {
            Err(GenerationError::UnsupportedContentType(content_type)) => {
                assert_eq!(content_type, "text/html");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("text/html must not be accepted"),
        }
    }

    #[tokio::test]
    async fn test_missing_content_type_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/twitter/1")
            .with_status(200)
            .with_body("raw bytes")
            .create_async()
            .await;

        let result = generate_from(&server).await;
        assert!(matches!(
            result,
            Err(GenerationError::UnsupportedContentType(_))
        ));
    }

    #[tokio::test]
    async fn test_png_with_known_length() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/twitter/1")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body("pngdata")
            .create_async()
            .await;

        let result = generate_from(&server).await.unwrap();
        assert_eq!(result.content_type, "image/png");
        assert_eq!(result.content_length, Some(7));
        let chunks: Vec<bytes::Bytes> = result.stream.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"pngdata");
    }

    #[tokio::test]
    async fn test_chunked_body_is_streamed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/twitter/1")
            .with_status(200)
            .with_header("content-type", "video/mp4")
            .with_chunked_body(|w| {
                w.write_all(b"frame-one;")?;
                w.write_all(b"frame-two")
            })
            .create_async()
            .await;

        let result = generate_from(&server).await.unwrap();
        assert_eq!(result.content_type, "video/mp4");
        assert_eq!(result.content_length, None);
        let chunks: Vec<bytes::Bytes> = result.stream.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"frame-one;frame-two");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_request_error() {
        let generator = HttpSnapGenerator::new("http://127.0.0.1:9").unwrap();
        let key = ResourceKey::new("teamA", "1").unwrap();
        let result = generator.generate(&key).await;
        assert!(matches!(result, Err(GenerationError::Request(_))));
    }
}
