//! Speech Handler - POST /tts

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

use crate::application::SpeakTextCommand;
use crate::infrastructure::http::dto::{SpeechResponse, TtsRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 合成任意文本
pub async fn tts(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<Json<SpeechResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let audio_url = state
        .synthesizer
        .handle(SpeakTextCommand { text: req.text })
        .await?;

    Ok(Json(SpeechResponse { audio_url }))
}
