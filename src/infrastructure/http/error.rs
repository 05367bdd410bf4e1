//! HTTP Error Handling
//!
//! 响应体只包含固定提示语；底层细节只进日志

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::dto::{AdvisoryResponse, SpeechErrorResponse};
use crate::application::ports::SynthesisError;
use crate::application::{advisory, TurnError};

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    /// 轮次失败（编排器已记录日志）
    Turn(TurnError),
    /// 请求里没有 `file` 字段
    NoUpload,
    /// 上传读取失败（超出大小限制、multipart 格式错误）
    BadUpload(String),
    /// 请求体不是预期的 JSON
    BadRequest(String),
    /// /tts 合成失败
    Speech(SynthesisError),
}

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        ApiError::Turn(err)
    }
}

impl From<SynthesisError> for ApiError {
    fn from(err: SynthesisError) -> Self {
        ApiError::Speech(err)
    }
}

fn advisory_response(error: &'static str) -> Response {
    (StatusCode::OK, Json(AdvisoryResponse { error })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Turn(e) => advisory_response(e.user_message()),
            ApiError::NoUpload => {
                tracing::warn!("Voice request without audio file");
                advisory_response(advisory::NO_UPLOAD)
            }
            ApiError::BadUpload(msg) => {
                tracing::warn!(error = %msg, "Failed to read uploaded audio");
                advisory_response(advisory::AUDIO_FAILED)
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(error = %msg, "Bad request");
                advisory_response(advisory::GENERIC)
            }
            ApiError::Speech(e) => {
                let error = match e {
                    SynthesisError::Unavailable => advisory::TTS_NOT_LOADED,
                    other => {
                        tracing::warn!(error = %other, "Speech synthesis failed");
                        advisory::TTS_FAILED
                    }
                };
                (
                    StatusCode::OK,
                    Json(SpeechErrorResponse {
                        error,
                        audio_url: None,
                    }),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TranscodeError;
    use axum::body::to_bytes;
    use serde_json::Value;
    use std::time::Duration;

    async fn body(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_turn_error_exposes_only_advisory() {
        let err = ApiError::from(TurnError::from(TranscodeError::Failed {
            code: Some(1),
            detail: "/tmp/input_x.webm: Invalid data".to_string(),
        }));
        let (status, json) = body(err).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({"error": advisory::AUDIO_FAILED}));
    }

    #[tokio::test]
    async fn test_timeout_advisory() {
        let err = ApiError::from(TurnError::from(TranscodeError::Timeout(
            Duration::from_secs(10),
        )));
        let (_, json) = body(err).await;
        assert_eq!(json["error"], advisory::TOO_LONG);
    }

    #[tokio::test]
    async fn test_speech_errors_carry_null_audio_url() {
        let (_, json) = body(ApiError::from(SynthesisError::Unavailable)).await;
        assert_eq!(
            json,
            serde_json::json!({"error": "TTS model not loaded", "audio_url": null})
        );

        let (_, json) = body(ApiError::from(SynthesisError::Failed("exit 1".into()))).await;
        assert_eq!(json["error"], "Speech synthesis failed");
        assert!(json["audio_url"].is_null());
    }

    #[tokio::test]
    async fn test_no_upload() {
        let (_, json) = body(ApiError::NoUpload).await;
        assert_eq!(json["error"], "No audio file uploaded.");
    }
}
