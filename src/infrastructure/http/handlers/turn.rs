//! Turn Handlers - POST /voice-chat, POST /chat
//!
//! 每个请求一个 CancellationToken，handler Future 被丢弃（客户端断开）时
//! drop guard 触发取消，正在运行的外部进程随之被终止。

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::application::{TextTurnCommand, TurnOutcome, VoiceTurnCommand};
use crate::domain::RawAudioUpload;
use crate::infrastructure::http::dto::{AdvisoryResponse, ChatRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 上传字段名
const UPLOAD_FIELD: &str = "file";

impl IntoResponse for TurnOutcome {
    fn into_response(self) -> Response {
        match self {
            TurnOutcome::Replied(reply) => Json(reply).into_response(),
            TurnOutcome::Advisory(error) => Json(AdvisoryResponse { error }).into_response(),
        }
    }
}

/// 语音轮次
pub async fn voice_chat(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<TurnOutcome, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadUpload(e.body_text()))?;
    let mut upload: Option<RawAudioUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadUpload(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadUpload(format!("Failed to read file: {}", e)))?;

        let mut raw = RawAudioUpload::new(bytes.to_vec(), content_type);
        if let Some(name) = file_name {
            raw = raw.with_file_name(name);
        }
        upload = Some(raw);
        break;
    }

    let upload = upload.ok_or(ApiError::NoUpload)?;

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let outcome = state
        .orchestrator
        .handle_voice(VoiceTurnCommand { upload, cancel })
        .await?;
    Ok(outcome)
}

/// 文本轮次
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<TurnOutcome, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let outcome = state
        .orchestrator
        .handle_text(TextTurnCommand {
            message: req.message,
            cancel,
        })
        .await?;
    Ok(outcome)
}
