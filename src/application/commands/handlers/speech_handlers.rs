//! Speech Handlers - 语音合成
//!
//! 合成失败永远是降级：轮次照常返回文本，`audio_url` 为 null。

use std::sync::Arc;
use std::time::Duration;

use crate::application::commands::SpeakTextCommand;
use crate::application::ports::{AudioStoragePort, SpeechEnginePort, SynthesisError};
use crate::domain::{sanitize_for_speech, TurnId};

/// 合成配置
#[derive(Debug, Clone)]
pub struct SpeechSynthesizerConfig {
    /// 音频链接的公开 Base URL
    pub base_url: String,
    /// 单次合成的截止时间
    pub timeout: Duration,
}

impl Default for SpeechSynthesizerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// SpeechSynthesizer
///
/// `engine` 为 None 表示启动时加载失败，此后每次调用都直接走降级路径
pub struct SpeechSynthesizer {
    config: SpeechSynthesizerConfig,
    engine: Option<Arc<dyn SpeechEnginePort>>,
    storage: Arc<dyn AudioStoragePort>,
}

impl SpeechSynthesizer {
    pub fn new(
        config: SpeechSynthesizerConfig,
        engine: Option<Arc<dyn SpeechEnginePort>>,
        storage: Arc<dyn AudioStoragePort>,
    ) -> Self {
        Self {
            config,
            engine,
            storage,
        }
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    /// 音频的公开 URL
    pub fn audio_url(&self, file_name: &str) -> String {
        format!(
            "{}/audio/{}",
            self.config.base_url.trim_end_matches('/'),
            file_name
        )
    }

    /// 清洗并合成文本，返回音频 URL
    pub async fn handle(&self, command: SpeakTextCommand) -> Result<String, SynthesisError> {
        let engine = self.engine.as_ref().ok_or(SynthesisError::Unavailable)?;

        let text = sanitize_for_speech(&command.text);
        if text.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let stored = self
            .storage
            .allocate()
            .await
            .map_err(|e| SynthesisError::Storage(e.to_string()))?;

        let result = match tokio::time::timeout(
            self.config.timeout,
            engine.synthesize(&text, &stored.path),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SynthesisError::Timeout(self.config.timeout)),
        };

        if let Err(e) = result {
            // 删除可能写了一半的文件
            if let Err(cleanup) = self.storage.delete_audio(&stored.file_name).await {
                tracing::warn!(
                    file = %stored.file_name,
                    error = %cleanup,
                    "Failed to delete partial audio"
                );
            }
            return Err(e);
        }

        if !self.storage.audio_exists(&stored.file_name).await {
            return Err(SynthesisError::Failed(
                "engine reported success but wrote no audio".to_string(),
            ));
        }

        tracing::info!(
            file = %stored.file_name,
            text_len = text.len(),
            "Speech synthesized"
        );

        Ok(self.audio_url(&stored.file_name))
    }

    /// 轮次内的合成：失败只记日志，返回 None
    pub async fn synthesize_for_turn(&self, turn_id: TurnId, speakable: &str) -> Option<String> {
        match self
            .handle(SpeakTextCommand {
                text: speakable.to_string(),
            })
            .await
        {
            Ok(url) => Some(url),
            Err(SynthesisError::Unavailable) => {
                tracing::debug!(turn_id = %turn_id, "Speech engine unavailable, skipping audio");
                None
            }
            Err(e) => {
                tracing::warn!(
                    turn_id = %turn_id,
                    stage = "synthesis",
                    error = %e,
                    "Speech synthesis failed, replying without audio"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::{FakeSpeechEngine, FileAudioStorage};
    use tempfile::tempdir;

    async fn synthesizer(
        dir: &std::path::Path,
        engine: Option<Arc<dyn SpeechEnginePort>>,
    ) -> (SpeechSynthesizer, Arc<FileAudioStorage>) {
        let storage = Arc::new(FileAudioStorage::new(dir).await.unwrap());
        let config = SpeechSynthesizerConfig {
            base_url: "http://127.0.0.1:8000/".to_string(),
            timeout: Duration::from_millis(200),
        };
        (
            SpeechSynthesizer::new(config, engine, storage.clone()),
            storage,
        )
    }

    #[tokio::test]
    async fn test_synthesizes_sanitized_text() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(FakeSpeechEngine::new());
        let (synth, storage) = synthesizer(dir.path(), Some(engine.clone())).await;

        let url = synth
            .handle(SpeakTextCommand {
                text: "**Hello** 👋 there!".to_string(),
            })
            .await
            .unwrap();

        assert!(url.starts_with("http://127.0.0.1:8000/audio/"));
        assert!(url.ends_with(".wav"));
        assert_eq!(engine.spoken(), vec!["Hello  there!".to_string()]);

        let file_name = url.rsplit('/').next().unwrap();
        assert!(storage.audio_exists(file_name).await);
    }

    #[tokio::test]
    async fn test_unavailable_engine_short_circuits() {
        let dir = tempdir().unwrap();
        let (synth, storage) = synthesizer(dir.path(), None).await;

        let result = synth
            .handle(SpeakTextCommand {
                text: "hello".to_string(),
            })
            .await;
        assert!(matches!(result, Err(SynthesisError::Unavailable)));
        assert!(!synth.is_available());
        assert_eq!(storage.get_stats().await.unwrap().file_count, 0);
    }

    #[tokio::test]
    async fn test_empty_after_sanitize_is_not_synthesized() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(FakeSpeechEngine::new());
        let (synth, _) = synthesizer(dir.path(), Some(engine.clone())).await;

        let result = synth
            .handle(SpeakTextCommand {
                text: "🎉🎉".to_string(),
            })
            .await;
        assert!(matches!(result, Err(SynthesisError::EmptyText)));
        assert!(engine.spoken().is_empty());
    }

    #[tokio::test]
    async fn test_failure_removes_partial_file() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(FakeSpeechEngine::failing());
        let (synth, storage) = synthesizer(dir.path(), Some(engine)).await;

        let result = synth.synthesize_for_turn(TurnId::new(), "Hello").await;
        assert!(result.is_none());
        assert_eq!(storage.get_stats().await.unwrap().file_count, 0);
    }

    #[tokio::test]
    async fn test_timeout_degrades() {
        let dir = tempdir().unwrap();
        let engine = Arc::new(FakeSpeechEngine::new().with_delay(Duration::from_secs(5)));
        let (synth, storage) = synthesizer(dir.path(), Some(engine)).await;

        let result = synth
            .handle(SpeakTextCommand {
                text: "Hello".to_string(),
            })
            .await;
        assert!(matches!(result, Err(SynthesisError::Timeout(_))));
        assert_eq!(storage.get_stats().await.unwrap().file_count, 0);
    }
}
