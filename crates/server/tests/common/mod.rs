//! # Common Test Utilities
//!
//! `TestApp` spawns the real router on a random port. Two flavors:
//!
//! - `TestApp::spawn()` builds the state from a generated `config.yml`, with
//!   the LLM and speech endpoints pointed at an `httpmock::MockServer` and the
//!   OCR / transcoder binaries pointed at names that do not exist.
//! - `TestApp::spawn_with_fakes()` swaps every external collaborator for a
//!   `finovia-test-utils` fake.

// Allow unused code because this is a test utility module, and not all
// functions might be used by every test file that includes it.
#![allow(unused)]

use anyhow::Result;
use axum::serve;
use finovia::{
    extract::{AudioTextExtractor, OcrTextExtractor},
    structured::LlmStructuredExtractor,
    uploads::UploadStore,
    Pipeline,
};
use finovia_server::{
    config::{self, AppConfig},
    router,
    state::{build_app_state, AppState},
};
use finovia_test_utils::{FakeOcrEngine, FakeSpeechRecognizer, FakeTranscoder, MockAiProvider};
use httpmock::{Method::POST, MockServer};
use reqwest::{multipart, Client};
use serde_json::json;
use std::{fs::File, io::Write, net::SocketAddr, path::PathBuf, sync::Arc};
use tempfile::{tempdir, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

pub const CHAT_PATH: &str = "/v1/chat/completions";
pub const TRANSCRIPTION_PATH: &str = "/v1/audio/transcriptions";
pub const TEST_UPLOAD_LIMIT: usize = 64 * 1024;

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub upload_root: PathBuf,
    pub app_state: AppState,
    _config_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

/// Writes a `config.yml` into `config_dir` and loads it.
fn write_config(config_dir: &TempDir, mock_server: &MockServer) -> Result<AppConfig> {
    let upload_root = config_dir.path().join("uploads");
    let config_path = config_dir.path().join("config.yml");
    let config_content = format!(
        r#"
port: 0
host: "127.0.0.1"
uploads:
  root_dir: "{}"
  max_files_per_category: 10
  max_upload_bytes: {}
ocr:
  binary: "finovia-test-missing-tesseract"
transcoder:
  binary: "finovia-test-missing-ffmpeg"
speech:
  provider: "whisper"
  api_url: "{}"
  model: "whisper-1"
timeouts:
  external_secs: 5
providers:
  default:
    provider: "local"
    api_url: "{}"
    api_key: null
    model_name: "mock-chat-model"
"#,
        upload_root.display(),
        TEST_UPLOAD_LIMIT,
        mock_server.url(TRANSCRIPTION_PATH),
        mock_server.url(CHAT_PATH)
    );
    let mut file = File::create(&config_path)?;
    file.write_all(config_content.as_bytes())?;

    let config_path = config_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("temp config path is not UTF-8"))?;
    Ok(config::get_config(Some(config_path))?)
}

impl TestApp {
    /// Spawns the server with state built from configuration.
    pub async fn spawn() -> Result<Self> {
        let mock_server = MockServer::start_async().await;
        let config_dir = tempdir()?;
        let config = write_config(&config_dir, &mock_server)?;
        let app_state = build_app_state(config).await?;
        TestApp::spawn_with_state(app_state, mock_server, config_dir).await
    }

    /// Spawns the server with fake OCR, transcoding, speech and LLM collaborators.
    pub async fn spawn_with_fakes(
        ocr: FakeOcrEngine,
        recognizer: FakeSpeechRecognizer,
        ai: MockAiProvider,
    ) -> Result<Self> {
        let mock_server = MockServer::start_async().await;
        let config_dir = tempdir()?;
        let config = write_config(&config_dir, &mock_server)?;

        let pipeline = Pipeline::new(
            Arc::new(OcrTextExtractor::new(Arc::new(ocr))),
            Arc::new(AudioTextExtractor::new(
                Arc::new(FakeTranscoder::passthrough()),
                Arc::new(recognizer),
            )),
            Arc::new(LlmStructuredExtractor::new(Arc::new(ai))),
        );
        let upload_store = UploadStore::new(
            &config.uploads.root_dir,
            config.uploads.max_files_per_category,
        );
        let app_state = AppState::from_parts(config, pipeline, upload_store);
        TestApp::spawn_with_state(app_state, mock_server, config_dir).await
    }

    async fn spawn_with_state(
        app_state: AppState,
        mock_server: MockServer,
        config_dir: TempDir,
    ) -> Result<Self> {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let upload_root = PathBuf::from(&app_state.config.uploads.root_dir);
        let app_state_for_harness = app_state.clone();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(app_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            upload_root,
            app_state: app_state_for_harness,
            _config_dir: config_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Programs the mock LLM to answer every chat completion with `content`.
    pub async fn mock_chat_response(&self, content: &str) -> httpmock::Mock<'_> {
        let content = content.to_string();
        self.mock_server
            .mock_async(|when, then| {
                when.method(POST).path(CHAT_PATH);
                then.status(200).json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": content}}]
                }));
            })
            .await
    }

    /// Posts a single `file` part to `path`.
    pub async fn post_file(
        &self,
        path: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<reqwest::Response> {
        let part = multipart::Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        Ok(self
            .client
            .post(format!("{}{path}", self.address))
            .multipart(form)
            .send()
            .await?)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
