//! 应用层错误定义
//!
//! 轮次级错误分类。`Display` 给运维看（包含底层信息），
//! [`TurnError::user_message`] 给调用方看（固定提示语，从不包含子进程 stderr）。

use std::time::Duration;
use thiserror::Error;

use crate::application::admission::AdmissionError;
use crate::application::ports::{
    GenerationError, TempFileError, TranscodeError, TranscriptionError,
};

/// 面向用户的提示语
pub mod advisory {
    pub const EMPTY_INPUT: &str = "I could not hear you clearly. Please speak again.";
    pub const AUDIO_FAILED: &str = "Audio processing failed. Please try again.";
    pub const TOO_LONG: &str = "Speech processing took too long. Please try again.";
    pub const GENERATION_FAILED: &str = "The tutor could not answer right now. Please try again.";
    pub const GENERATION_TIMEOUT: &str = "The tutor took too long to answer. Please try again.";
    pub const MODEL_UNAVAILABLE: &str = "The tutor model is not available right now.";
    pub const BUSY: &str = "The tutor is busy right now. Please try again in a moment.";
    pub const GENERIC: &str = "Something went wrong. Please try again.";
    pub const NO_UPLOAD: &str = "No audio file uploaded.";
    pub const TTS_NOT_LOADED: &str = "TTS model not loaded";
    pub const TTS_FAILED: &str = "Speech synthesis failed";
}

/// 轮次错误
///
/// 合成失败不在这里：它永远不会中止轮次
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Transcode failed: {0}")]
    Transcode(TranscodeError),

    #[error("Transcription failed: {0}")]
    Transcription(TranscriptionError),

    #[error("Generation failed: {0}")]
    Generation(GenerationError),

    #[error("Generation exceeded deadline of {0:?}")]
    GenerationTimeout(Duration),

    /// 启动时模型加载失败或引擎不可达
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Service busy: {engine} gate already has {waiting} waiting callers")]
    ServiceBusy { engine: &'static str, waiting: usize },

    #[error("Turn cancelled")]
    Cancelled,

    #[error("Temp storage error: {0}")]
    Storage(String),
}

impl TurnError {
    /// 给调用方的固定提示语
    pub fn user_message(&self) -> &'static str {
        match self {
            TurnError::Transcode(TranscodeError::Timeout(_))
            | TurnError::Transcription(TranscriptionError::Timeout(_)) => advisory::TOO_LONG,
            TurnError::Transcode(_) | TurnError::Transcription(_) => advisory::AUDIO_FAILED,
            TurnError::Generation(_) => advisory::GENERATION_FAILED,
            TurnError::GenerationTimeout(_) => advisory::GENERATION_TIMEOUT,
            TurnError::EngineUnavailable(_) => advisory::MODEL_UNAVAILABLE,
            TurnError::ServiceBusy { .. } => advisory::BUSY,
            TurnError::Cancelled | TurnError::Storage(_) => advisory::GENERIC,
        }
    }

    /// 出错的阶段（日志字段）
    pub fn stage(&self) -> &'static str {
        match self {
            TurnError::Transcode(_) => "transcode",
            TurnError::Transcription(_) => "transcription",
            TurnError::Generation(_)
            | TurnError::GenerationTimeout(_)
            | TurnError::EngineUnavailable(_) => "generation",
            TurnError::ServiceBusy { .. } => "admission",
            TurnError::Cancelled => "cancelled",
            TurnError::Storage(_) => "storage",
        }
    }

    /// 创建存储错误
    pub fn storage(message: impl std::fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }
}

impl From<TranscodeError> for TurnError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::Cancelled => Self::Cancelled,
            other => Self::Transcode(other),
        }
    }
}

impl From<TranscriptionError> for TurnError {
    fn from(err: TranscriptionError) -> Self {
        match err {
            TranscriptionError::Cancelled => Self::Cancelled,
            other => Self::Transcription(other),
        }
    }
}

impl From<GenerationError> for TurnError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Unavailable(msg) => Self::EngineUnavailable(msg),
            other => Self::Generation(other),
        }
    }
}

impl From<AdmissionError> for TurnError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::Busy { engine, waiting } => Self::ServiceBusy { engine, waiting },
            AdmissionError::Cancelled { .. } | AdmissionError::Closed { .. } => Self::Cancelled,
        }
    }
}

impl From<TempFileError> for TurnError {
    fn from(err: TempFileError) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_map_to_too_long() {
        let err = TurnError::from(TranscodeError::Timeout(Duration::from_secs(10)));
        assert_eq!(err.user_message(), advisory::TOO_LONG);

        let err = TurnError::from(TranscriptionError::Timeout(Duration::from_secs(60)));
        assert_eq!(err.user_message(), advisory::TOO_LONG);
    }

    #[test]
    fn test_process_failures_hide_stderr() {
        let err = TurnError::from(TranscodeError::Failed {
            code: Some(1),
            detail: "Invalid data found when processing input".to_string(),
        });
        assert_eq!(err.user_message(), advisory::AUDIO_FAILED);
        assert!(err.to_string().contains("Invalid data found"));
        assert_eq!(err.stage(), "transcode");
    }

    #[test]
    fn test_cancellation_is_not_a_stage_failure() {
        assert!(matches!(
            TurnError::from(TranscodeError::Cancelled),
            TurnError::Cancelled
        ));
        assert!(matches!(
            TurnError::from(TranscriptionError::Cancelled),
            TurnError::Cancelled
        ));
    }

    #[test]
    fn test_unavailable_generation_engine() {
        let err = TurnError::from(GenerationError::Unavailable("connection refused".into()));
        assert!(matches!(err, TurnError::EngineUnavailable(_)));
        assert_eq!(err.user_message(), advisory::MODEL_UNAVAILABLE);
    }

    #[test]
    fn test_busy_gate() {
        let err = TurnError::from(AdmissionError::Busy {
            engine: "generation",
            waiting: 4,
        });
        assert_eq!(err.user_message(), advisory::BUSY);
        assert_eq!(err.stage(), "admission");
    }
}
