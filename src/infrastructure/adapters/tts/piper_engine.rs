//! Piper Engine - 调用 Piper 命令行合成 WAV
//!
//! `piper --model <model.onnx> --output_file <out.wav>`，文本从 stdin 写入。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{SpeechEnginePort, SynthesisError};
use crate::infrastructure::adapters::process::{BoundedProcess, ProcessError};

/// Piper 配置
#[derive(Debug, Clone)]
pub struct PiperEngineConfig {
    /// piper 可执行文件
    pub binary: PathBuf,
    /// onnx 声音模型
    pub model: PathBuf,
    /// 单次合成的墙钟超时
    pub timeout: Duration,
}

impl Default for PiperEngineConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("piper"),
            model: PathBuf::from("models/tts/en_US-lessac-medium.onnx"),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Piper 合成引擎
pub struct PiperEngine {
    config: PiperEngineConfig,
}

impl PiperEngine {
    /// 加载引擎
    ///
    /// 模型文件不存在时返回 None，由调用方走"TTS 未加载"路径
    pub fn load(config: PiperEngineConfig) -> Option<Self> {
        if !config.model.is_file() {
            tracing::warn!(
                model = %config.model.display(),
                "TTS model not found, speech synthesis disabled"
            );
            return None;
        }

        tracing::info!(
            binary = %config.binary.display(),
            model = %config.model.display(),
            "Piper TTS engine loaded"
        );
        Some(Self { config })
    }
}

#[async_trait]
impl SpeechEnginePort for PiperEngine {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let result = BoundedProcess::new(&self.config.binary, self.config.timeout)
            .arg("--model")
            .arg(&self.config.model)
            .arg("--output_file")
            .arg(output)
            .stdin(format!("{}\n", text))
            .run(&CancellationToken::new())
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, detail = %e.detail(), "piper failed");
                Err(match e {
                    ProcessError::TimedOut { limit, .. } => SynthesisError::Timeout(limit),
                    ProcessError::Spawn { reason, .. } => {
                        SynthesisError::Failed(format!("cannot start piper: {}", reason))
                    }
                    other => SynthesisError::Failed(other.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_model_is_not_loaded() {
        let config = PiperEngineConfig {
            model: PathBuf::from("/nonexistent/voice.onnx"),
            ..Default::default()
        };
        assert!(PiperEngine::load(config).is_none());
    }

    #[test]
    fn test_existing_model_loads() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("voice.onnx");
        std::fs::write(&model, b"onnx").unwrap();

        let config = PiperEngineConfig {
            model,
            ..Default::default()
        };
        assert!(PiperEngine::load(config).is_some());
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use crate::infrastructure::adapters::process::test_scripts::write_script;

        fn engine(dir: &Path, body: &str, timeout: Duration) -> PiperEngine {
            let model = dir.join("voice.onnx");
            std::fs::write(&model, b"onnx").unwrap();
            let binary = write_script(dir, "piper", body);
            PiperEngine::load(PiperEngineConfig {
                binary,
                model,
                timeout,
            })
            .unwrap()
        }

        #[tokio::test]
        async fn test_writes_stdin_text_to_output_file() {
            let dir = tempdir().unwrap();
            // $4 是 --output_file 的值
            let engine = engine(dir.path(), r#"cat > "$4""#, Duration::from_secs(5));
            let output = dir.path().join("out.wav");

            engine.synthesize("I need water.", &output).await.unwrap();
            assert_eq!(std::fs::read_to_string(&output).unwrap(), "I need water.\n");
        }

        #[tokio::test]
        async fn test_empty_text_is_not_synthesized() {
            let dir = tempdir().unwrap();
            let marker = dir.path().join("ran");
            let engine = engine(
                dir.path(),
                &format!("touch {}", marker.display()),
                Duration::from_secs(5),
            );

            let err = engine
                .synthesize("   ", &dir.path().join("out.wav"))
                .await
                .unwrap_err();
            assert!(matches!(err, SynthesisError::EmptyText));
            assert!(!marker.exists());
        }

        #[tokio::test]
        async fn test_failure_and_timeout() {
            let dir = tempdir().unwrap();
            let failing = engine(dir.path(), "exit 1", Duration::from_secs(5));
            assert!(matches!(
                failing.synthesize("hi", &dir.path().join("a.wav")).await,
                Err(SynthesisError::Failed(_))
            ));

            let slow = engine(dir.path(), "sleep 5", Duration::from_millis(100));
            assert!(matches!(
                slow.synthesize("hi", &dir.path().join("b.wav")).await,
                Err(SynthesisError::Timeout(_))
            ));
        }
    }
}
