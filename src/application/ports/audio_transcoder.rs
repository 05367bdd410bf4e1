//! Audio Transcoder Port - 音频规范化抽象
//!
//! 把任意格式的上传音频转换为 STT 引擎要求的规范格式
//! （单声道、16 kHz、有符号 16 位 PCM WAV）

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// 转码错误
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// 转码进程非零退出，detail 仅用于日志
    #[error("Transcoder exited with code {code:?}: {detail}")]
    Failed { code: Option<i32>, detail: String },

    #[error("Transcoder timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transcode cancelled")]
    Cancelled,

    #[error("Transcoder unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// 规范音频格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalFormat {
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u16,
}

/// STT 引擎要求的格式
pub const CANONICAL_FORMAT: CanonicalFormat = CanonicalFormat {
    sample_rate: 16000,
    channels: 1,
    bits_per_sample: 16,
};

/// 音频信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInfo {
    /// 时长（毫秒）
    pub duration_ms: u64,
    /// 采样率
    pub sample_rate: u32,
    /// 声道数
    pub channels: u8,
    /// 位深度
    pub bits_per_sample: u16,
    /// 数据大小（字节）
    pub data_size: usize,
}

impl AudioInfo {
    /// 是否符合规范格式
    pub fn matches(&self, format: &CanonicalFormat) -> bool {
        self.sample_rate == format.sample_rate
            && self.channels == format.channels
            && self.bits_per_sample == format.bits_per_sample
    }
}

/// Audio Transcoder Port
///
/// 不经过准入控制：转码是轻量、无状态的外部进程，可以完全并发
#[async_trait]
pub trait AudioTranscoderPort: Send + Sync {
    /// 转码为规范格式
    ///
    /// # Arguments
    /// * `input` - 任意格式的输入文件
    /// * `output` - 规范 WAV 的输出路径
    /// * `cancel` - 请求取消信号，触发后必须终止子进程
    async fn to_canonical(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<AudioInfo, TranscodeError>;
}
