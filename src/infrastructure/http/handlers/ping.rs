//! Ping Handler
//!
//! 健康检查，附带引擎闸门的实时状态

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::infrastructure::http::dto::PingResponse;
use crate::infrastructure::http::state::AppState;

/// Ping endpoint - 健康检查
pub async fn ping(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        tts_available: state.synthesizer.is_available(),
        engines: state.admission.stats(),
    })
}
