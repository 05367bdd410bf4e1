//! Transcription Engine Port - 语音转写抽象

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::TranscriptText;

/// 转写错误
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// 引擎非零退出，detail 仅用于日志
    #[error("Transcription engine exited with code {code:?}: {detail}")]
    Failed { code: Option<i32>, detail: String },

    #[error("Transcription timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transcription cancelled")]
    Cancelled,

    #[error("Transcription engine unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Transcription Engine Port
///
/// 单实例重量级引擎，调用方必须先通过准入控制
#[async_trait]
pub trait TranscriptionEnginePort: Send + Sync {
    /// 转写规范 WAV
    ///
    /// 空文本是合法结果（没有听清），不是错误
    async fn transcribe(
        &self,
        wav_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<TranscriptText, TranscriptionError>;
}
