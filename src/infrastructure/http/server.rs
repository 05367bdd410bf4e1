//! HTTP Server
//!
//! Axum HTTP 服务器启动和配置

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::middleware::request_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 请求体大小上限（字节）
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_size: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_max_upload_size(mut self, bytes: usize) -> Self {
        self.max_upload_size = bytes;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// 创建新的 HTTP 服务器
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// 构建 Router
    pub fn build_router(&self) -> Router {
        // CORS 配置 - 允许所有来源的跨域请求（前端在另一个端口）
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .expose_headers(Any)
            .max_age(std::time::Duration::from_secs(3600));

        create_routes(&self.state.audio_dir)
            .layer(DefaultBodyLimit::max(self.config.max_upload_size))
            .layer(middleware::from_fn(request_logging_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// 启动服务器（带优雅关闭）
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let addr = self.config.addr();

        info!("Starting HTTP server on {} (with graceful shutdown)", addr);

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{
        EngineAdmissionController, SpeechSynthesizer, SpeechSynthesizerConfig, TurnOrchestrator,
        TurnOrchestratorConfig,
    };
    use crate::application::ports::SpeechEnginePort;
    use crate::infrastructure::adapters::{
        FakeGenerationEngine, FakeSpeechEngine, FakeTranscoder, FakeTranscriber,
        FileAudioStorage, LocalTempStore,
    };
    use axum::body::{to_bytes, Body};
    use http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "vaani-test-boundary";

    struct TestApp {
        _dir: TempDir,
        router: Router,
        transcoder: Arc<FakeTranscoder>,
    }

    async fn build_app(speech: Option<FakeSpeechEngine>, max_upload_size: usize) -> TestApp {
        let dir = TempDir::new().unwrap();
        let audio_dir = dir.path().join("audio");
        let storage = Arc::new(FileAudioStorage::new(&audio_dir).await.unwrap());

        let engine: Option<Arc<dyn SpeechEnginePort>> =
            speech.map(|s| Arc::new(s) as Arc<dyn SpeechEnginePort>);
        let synthesizer = Arc::new(SpeechSynthesizer::new(
            SpeechSynthesizerConfig {
                base_url: "http://127.0.0.1:8000".to_string(),
                ..Default::default()
            },
            engine,
            storage,
        ));
        let admission = Arc::new(EngineAdmissionController::unbounded());
        let transcoder = Arc::new(FakeTranscoder::new());

        let orchestrator = Arc::new(TurnOrchestrator::new(
            TurnOrchestratorConfig::default(),
            Arc::new(LocalTempStore::new(dir.path().join("temp"))),
            transcoder.clone(),
            Arc::new(FakeTranscriber::new("मुझे पानी चाहिए")),
            Arc::new(FakeGenerationEngine::new(
                "English: I need water.\nHindi: मुझे पानी चाहिए\nNext: Are you thirsty often?",
            )),
            synthesizer.clone(),
            admission.clone(),
        ));

        let state = AppState::new(orchestrator, synthesizer, admission, audio_dir);
        let config = ServerConfig::default().with_max_upload_size(max_upload_size);
        let router = HttpServer::new(config, state).build_router();

        TestApp {
            _dir: dir,
            router,
            transcoder,
        }
    }

    fn multipart(field: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"recording.webm\"\r\nContent-Type: audio/webm\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/voice-chat")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_voice_chat_replies_with_audio_url() {
        let app = build_app(Some(FakeSpeechEngine::new()), 1024 * 1024).await;

        let (status, json) = send(&app.router, multipart("file", b"webm bytes")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["response"].as_str().unwrap().starts_with("English: I need water."));

        let audio_url = json["audio_url"].as_str().unwrap();
        assert!(audio_url.starts_with("http://127.0.0.1:8000/audio/"));

        // 音频可以通过 /audio 下载
        let path = audio_url.trim_start_matches("http://127.0.0.1:8000");
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_voice_chat_without_file_field() {
        let app = build_app(Some(FakeSpeechEngine::new()), 1024 * 1024).await;

        let (status, json) = send(&app.router, multipart("audio", b"bytes")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"error": "No audio file uploaded."}));
        assert_eq!(app.transcoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected_before_transcoding() {
        let app = build_app(Some(FakeSpeechEngine::new()), 64).await;

        let (_, json) = send(&app.router, multipart("file", &[0u8; 4096])).await;
        assert_eq!(json["error"], "Audio processing failed. Please try again.");
        assert_eq!(app.transcoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_voice_chat_rejects_non_multipart_body() {
        let app = build_app(Some(FakeSpeechEngine::new()), 1024 * 1024).await;

        let (status, json) = send(&app.router, json_request("/voice-chat", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["error"], "Audio processing failed. Please try again.");
        assert_eq!(app.transcoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_chat_without_tts_has_null_audio() {
        let app = build_app(None, 1024 * 1024).await;

        let (status, json) = send(&app.router, json_request("/chat", json!({"message": "hello"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["response"].is_string());
        assert!(json["audio_url"].is_null());
    }

    #[tokio::test]
    async fn test_chat_empty_message_is_advisory() {
        let app = build_app(None, 1024 * 1024).await;

        let (_, json) = send(&app.router, json_request("/chat", json!({"message": "  "}))).await;
        assert_eq!(
            json,
            json!({"error": "I could not hear you clearly. Please speak again."})
        );
    }

    #[tokio::test]
    async fn test_tts_endpoint() {
        let app = build_app(Some(FakeSpeechEngine::new()), 1024 * 1024).await;
        let (_, json) = send(&app.router, json_request("/tts", json!({"text": "**Hello**"}))).await;
        assert!(json["audio_url"].as_str().unwrap().ends_with(".wav"));
        assert!(json.get("error").is_none());

        let app = build_app(None, 1024 * 1024).await;
        let (_, json) = send(&app.router, json_request("/tts", json!({"text": "Hello"}))).await;
        assert_eq!(json, json!({"error": "TTS model not loaded", "audio_url": null}));
    }

    #[tokio::test]
    async fn test_ping_reports_engines() {
        let app = build_app(None, 1024 * 1024).await;
        let request = Request::builder().uri("/api/ping").body(Body::empty()).unwrap();

        let (status, json) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["tts_available"], false);
        assert_eq!(json["engines"]["generation"]["busy"], false);
    }
}
