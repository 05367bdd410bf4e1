//! Speech Engine Port - TTS 合成引擎抽象

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// 合成错误
///
/// 对轮次永远不是致命错误：只会让 audio_url 为 null
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// 启动时模型加载失败
    #[error("Speech engine unavailable")]
    Unavailable,

    #[error("Nothing speakable after sanitization")]
    EmptyText,

    #[error("Synthesis timed out after {0:?}")]
    Timeout(Duration),

    #[error("Synthesis failed: {0}")]
    Failed(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Speech Engine Port
#[async_trait]
pub trait SpeechEnginePort: Send + Sync {
    /// 合成语音，副作用是在 `output` 写入 WAV 文件
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), SynthesisError>;
}
