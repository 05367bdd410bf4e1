//! HTTP Routes
//!
//! API Endpoints:
//! - /voice-chat         POST  上传录音（multipart 字段 `file`），返回导师回复
//! - /chat               POST  文本消息 `{"message": "..."}`，返回导师回复
//! - /tts                POST  合成任意文本 `{"text": "..."}`
//! - /audio/{file}       GET   下载合成音频
//! - /api/ping           GET   健康检查

use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes(audio_dir: &Path) -> Router<Arc<AppState>> {
    Router::new()
        .route("/voice-chat", post(handlers::voice_chat))
        .route("/chat", post(handlers::chat))
        .route("/tts", post(handlers::tts))
        .nest_service("/audio", ServeDir::new(audio_dir))
        .nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new().route("/ping", get(handlers::ping))
}
