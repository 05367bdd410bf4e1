//! Data Transfer Objects

use serde::{Deserialize, Serialize};

use crate::application::AdmissionStats;

// ============================================================================
// 请求
// ============================================================================

/// POST /chat
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// POST /tts
#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
}

// ============================================================================
// 响应
// ============================================================================

/// 提示性错误：`{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct AdvisoryResponse {
    pub error: &'static str,
}

/// POST /tts 成功
#[derive(Debug, Serialize)]
pub struct SpeechResponse {
    pub audio_url: String,
}

/// POST /tts 失败：`audio_url` 显式为 null
#[derive(Debug, Serialize)]
pub struct SpeechErrorResponse {
    pub error: &'static str,
    pub audio_url: Option<String>,
}

/// GET /api/ping
#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub tts_available: bool,
    pub engines: AdmissionStats,
}
