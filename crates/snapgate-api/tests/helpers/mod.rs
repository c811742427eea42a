//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p snapgate-api --test snap_test`.
//! Storage is a local directory under a temp dir; generation and notification
//! are in-process fakes.

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use bytes::Bytes;
use futures::stream;
use snapgate_api::setup::routes;
use snapgate_api::AppState;
use snapgate_core::{Config, ResourceKey};
use snapgate_infra::{NotifyError, Notifier};
use snapgate_services::{
    Gateway, GatewayOptions, GenerationError, GenerationResult, NotificationDispatcher,
    SnapGenerator,
};
use snapgate_storage::{LocalStorage, Storage};
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const FILES_BASE_URL: &str = "http://localhost:3000/files";

/// Generator returning a fixed PNG body, or a backend error when `fail` is set.
pub struct FakeGenerator {
    pub body: Vec<&'static [u8]>,
    pub fail: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn png(body: &[&'static [u8]]) -> Self {
        Self {
            body: body.to_vec(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::png(&[])
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapGenerator for FakeGenerator {
    async fn generate(&self, key: &ResourceKey) -> Result<GenerationResult, GenerationError> {
        self.calls.lock().unwrap().push(key.to_string());
        if self.fail {
            return Err(GenerationError::Status {
                status: 500,
                body: "renderer crashed".to_string(),
            });
        }

        let chunks: Vec<io::Result<Bytes>> = self
            .body
            .iter()
            .map(|c| Ok(Bytes::from_static(c)))
            .collect();
        Ok(GenerationResult {
            content_type: "image/png".to_string(),
            content_length: Some(self.body.iter().map(|c| c.len() as u64).sum()),
            stream: Box::pin(stream::iter(chunks)),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, message: &str) -> Result<(), NotifyError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Test application: server plus handles on the fakes behind it.
pub struct TestApp {
    pub server: TestServer,
    pub router: Router,
    pub state: Arc<AppState>,
    pub generator: Arc<FakeGenerator>,
    pub notifier: Arc<RecordingNotifier>,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Serve the router on a real loopback listener and return its base URL.
    pub async fn listen(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let router = self.router.clone();
        tokio::spawn(async move { axum::serve(listener, router).await });
        format!("http://{}", addr)
    }

    pub fn stored(&self, key: &str) -> Option<Vec<u8>> {
        std::fs::read(self.temp_dir.path().join(key)).ok()
    }

    /// Wait for the detached persistence task to store `key` and notify.
    pub async fn wait_for_persisted(&self, key: &str) -> Option<Vec<u8>> {
        for _ in 0..100 {
            if self.stored(key).is_some() && !self.notifier.messages().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.stored(key)
    }
}

fn test_config(storage_path: &str) -> Config {
    let vars: HashMap<&str, String> = [
        ("TWITTER_SNAP_API_BASEURL", "http://snap.test".to_string()),
        ("STORAGE_BACKEND", "local".to_string()),
        ("LOCAL_STORAGE_PATH", storage_path.to_string()),
        ("LOCAL_STORAGE_BASE_URL", FILES_BASE_URL.to_string()),
        ("ENVIRONMENT", "test".to_string()),
    ]
    .into_iter()
    .collect();

    let config =
        Config::from_lookup(|name| vars.get(name).cloned()).expect("Failed to build test config");
    config.validate().expect("Invalid test config");
    config
}

/// Setup a test app around `generator` with local storage in a temp dir.
pub async fn setup_test_app(generator: FakeGenerator) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let config = test_config(&temp_dir.path().to_string_lossy());

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(temp_dir.path(), FILES_BASE_URL.to_string())
            .await
            .expect("Failed to create local storage"),
    );
    let generator = Arc::new(generator);
    let notifier = Arc::new(RecordingNotifier::default());

    let gateway = Gateway::new(
        storage,
        generator.clone(),
        NotificationDispatcher::new(notifier.clone()),
        GatewayOptions::from(&config.gateway),
    );
    let state = Arc::new(AppState {
        config: config.clone(),
        gateway,
    });

    let router = routes::setup_routes(&config, state.clone()).expect("Failed to setup routes");
    let server =
        TestServer::new(router.clone().into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        router,
        state,
        generator,
        notifier,
        temp_dir,
    }
}
