//! Whisper CLI - 调用 whisper.cpp 的 `whisper-cli`
//!
//! `whisper-cli -m <model> -f <wav> -l <language> -nt`
//!
//! `-nt` 关闭时间戳，stdout 即转写文本（每个片段一行）。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{TranscriptionEnginePort, TranscriptionError};
use crate::domain::TranscriptText;
use crate::infrastructure::adapters::process::{BoundedProcess, ProcessError};

/// Whisper CLI 配置
#[derive(Debug, Clone)]
pub struct WhisperCliConfig {
    /// whisper-cli 可执行文件
    pub binary: PathBuf,
    /// ggml 模型文件
    pub model: PathBuf,
    /// 识别语言，"auto" 表示自动检测
    pub language: String,
    /// 单次转写的墙钟超时
    pub timeout: Duration,
}

impl Default for WhisperCliConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("whisper-cli"),
            model: PathBuf::from("models/ggml-small.bin"),
            language: "auto".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Whisper CLI 转写引擎
pub struct WhisperCli {
    config: WhisperCliConfig,
}

impl WhisperCli {
    pub fn new(config: WhisperCliConfig) -> Self {
        Self { config }
    }

    /// 模型文件是否存在（启动检查用）
    pub fn model_exists(&self) -> bool {
        self.config.model.is_file()
    }

    fn command(&self, wav_path: &Path) -> BoundedProcess {
        BoundedProcess::new(&self.config.binary, self.config.timeout)
            .arg("-m")
            .arg(&self.config.model)
            .arg("-f")
            .arg(wav_path)
            .args(["-l", &self.config.language, "-nt"])
    }
}

/// 把多行片段输出拼成一句
fn collect_transcript(stdout: &str) -> String {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl From<ProcessError> for TranscriptionError {
    fn from(err: ProcessError) -> Self {
        let detail = err.detail();
        match err {
            ProcessError::Spawn { reason, .. } => TranscriptionError::Unavailable(reason),
            ProcessError::TimedOut { limit, .. } => TranscriptionError::Timeout(limit),
            ProcessError::Cancelled { .. } => TranscriptionError::Cancelled,
            ProcessError::Io { reason, .. } => TranscriptionError::IoError(reason),
            ProcessError::Failed { code, .. } => TranscriptionError::Failed { code, detail },
        }
    }
}

#[async_trait]
impl TranscriptionEnginePort for WhisperCli {
    async fn transcribe(
        &self,
        wav_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<TranscriptText, TranscriptionError> {
        let output = match self.command(wav_path).run(cancel).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    wav = %wav_path.display(),
                    error = %e,
                    detail = %e.detail(),
                    "whisper-cli failed"
                );
                return Err(e.into());
            }
        };

        let transcript = TranscriptText::new(collect_transcript(&output.stdout));
        tracing::info!(
            elapsed_ms = output.elapsed.as_millis() as u64,
            chars = transcript.char_count(),
            transcript = %transcript,
            "Transcription finished"
        );

        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_transcript_joins_segments() {
        assert_eq!(
            collect_transcript(" मुझे पानी चाहिए\n\n और खाना भी \n"),
            "मुझे पानी चाहिए और खाना भी"
        );
        assert_eq!(collect_transcript("  \n \n"), "");
    }

    #[test]
    fn test_default_config() {
        let config = WhisperCliConfig::default();
        assert_eq!(config.language, "auto");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use crate::infrastructure::adapters::process::test_scripts::write_script;
        use tempfile::tempdir;

        fn engine(binary: PathBuf, timeout: Duration) -> WhisperCli {
            WhisperCli::new(WhisperCliConfig {
                binary,
                model: PathBuf::from("ggml-small.bin"),
                language: "hi".to_string(),
                timeout,
            })
        }

        #[tokio::test]
        async fn test_passes_model_file_and_language() {
            let dir = tempdir().unwrap();
            let binary = write_script(dir.path(), "whisper-cli", r#"echo " $@""#);

            let text = engine(binary, Duration::from_secs(5))
                .transcribe(Path::new("/tmp/canonical.wav"), &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(
                text.as_str(),
                "-m ggml-small.bin -f /tmp/canonical.wav -l hi -nt"
            );
        }

        #[tokio::test]
        async fn test_silence_is_empty_transcript() {
            let dir = tempdir().unwrap();
            let binary = write_script(dir.path(), "whisper-cli", "echo '   '");

            let text = engine(binary, Duration::from_secs(5))
                .transcribe(Path::new("/tmp/canonical.wav"), &CancellationToken::new())
                .await
                .unwrap();
            assert!(text.is_empty());
        }

        #[tokio::test]
        async fn test_failure_and_timeout() {
            let dir = tempdir().unwrap();
            let failing = write_script(dir.path(), "fail", "echo 'model load failed' >&2; exit 2");
            let err = engine(failing, Duration::from_secs(5))
                .transcribe(Path::new("x.wav"), &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(err, TranscriptionError::Failed { code: Some(2), .. }));

            let slow = write_script(dir.path(), "slow", "sleep 5");
            let err = engine(slow, Duration::from_millis(100))
                .transcribe(Path::new("x.wav"), &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(err, TranscriptionError::Timeout(_)));
        }
    }
}
