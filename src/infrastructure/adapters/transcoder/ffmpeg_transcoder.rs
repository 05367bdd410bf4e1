//! Ffmpeg Transcoder - 调用 ffmpeg 把任意上传转成规范 WAV
//!
//! `ffmpeg -nostdin -hide_banner -loglevel error -y -i <input> -ar 16000 -ac 1 -c:a pcm_s16le <output>`
//!
//! 前三个参数只影响 ffmpeg 自身的交互和日志：不读 stdin、stderr 只留错误信息。
//!
//! 转码完成后读取输出文件头，确认格式确实是规范格式再交给 STT。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use super::inspect_wav_header;
use crate::application::ports::{
    AudioInfo, AudioTranscoderPort, TranscodeError, CANONICAL_FORMAT,
};
use crate::infrastructure::adapters::process::{BoundedProcess, ProcessError};

/// Ffmpeg 转码器配置
#[derive(Debug, Clone)]
pub struct FfmpegTranscoderConfig {
    /// ffmpeg 可执行文件
    pub binary: PathBuf,
    /// 单次转码的墙钟超时
    pub timeout: Duration,
}

impl Default for FfmpegTranscoderConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Ffmpeg 转码器
///
/// 无状态，可以完全并发调用
pub struct FfmpegTranscoder {
    config: FfmpegTranscoderConfig,
}

impl FfmpegTranscoder {
    pub fn new(config: FfmpegTranscoderConfig) -> Self {
        Self { config }
    }

    fn command(&self, input: &Path, output: &Path) -> BoundedProcess {
        BoundedProcess::new(&self.config.binary, self.config.timeout)
            .args(["-nostdin", "-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(input)
            .args(["-ar", &CANONICAL_FORMAT.sample_rate.to_string()])
            .args(["-ac", &CANONICAL_FORMAT.channels.to_string()])
            .args(["-c:a", "pcm_s16le"])
            .arg(output)
    }
}

/// 输出文件头最多读取的字节数（fmt + LIST + data 头足够）
const HEADER_READ_LIMIT: u64 = 4096;

/// 读取文件开头和文件总长度
async fn read_header(path: &Path) -> std::io::Result<(Vec<u8>, u64)> {
    let file = tokio::fs::File::open(path).await?;
    let file_len = file.metadata().await?.len();
    let mut header = Vec::with_capacity(HEADER_READ_LIMIT as usize);
    file.take(HEADER_READ_LIMIT).read_to_end(&mut header).await?;
    Ok((header, file_len))
}

impl From<ProcessError> for TranscodeError {
    fn from(err: ProcessError) -> Self {
        let detail = err.detail();
        match err {
            ProcessError::Spawn { reason, .. } => TranscodeError::Unavailable(reason),
            ProcessError::TimedOut { limit, .. } => TranscodeError::Timeout(limit),
            ProcessError::Cancelled { .. } => TranscodeError::Cancelled,
            ProcessError::Io { reason, .. } => TranscodeError::IoError(reason),
            ProcessError::Failed { code, .. } => TranscodeError::Failed { code, detail },
        }
    }
}

#[async_trait]
impl AudioTranscoderPort for FfmpegTranscoder {
    async fn to_canonical(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<AudioInfo, TranscodeError> {
        let input_size = tokio::fs::metadata(input)
            .await
            .map_err(|e| TranscodeError::InvalidInput(format!("{}: {}", input.display(), e)))?
            .len();
        if input_size == 0 {
            return Err(TranscodeError::InvalidInput("empty upload".to_string()));
        }

        if let Err(e) = self.command(input, output).run(cancel).await {
            tracing::warn!(
                input = %input.display(),
                error = %e,
                detail = %e.detail(),
                "ffmpeg transcode failed"
            );
            return Err(e.into());
        }

        let (header, file_len) = read_header(output)
            .await
            .map_err(|e| TranscodeError::InvalidOutput(format!("{}: {}", output.display(), e)))?;
        let info = inspect_wav_header(&header, file_len)?;

        if !info.matches(&CANONICAL_FORMAT) {
            return Err(TranscodeError::InvalidOutput(format!(
                "expected {} Hz/{} ch/{} bit, got {} Hz/{} ch/{} bit",
                CANONICAL_FORMAT.sample_rate,
                CANONICAL_FORMAT.channels,
                CANONICAL_FORMAT.bits_per_sample,
                info.sample_rate,
                info.channels,
                info.bits_per_sample
            )));
        }

        tracing::debug!(
            input_size = input_size,
            duration_ms = info.duration_ms,
            "Upload transcoded to canonical WAV"
        );

        Ok(info)
    }
}
