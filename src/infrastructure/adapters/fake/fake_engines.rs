//! Fake 引擎实现
//!
//! 每个 fake 都记录调用次数/参数，测试可以据此断言哪些阶段被执行过。

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    AudioInfo, AudioTranscoderPort, GenerationEnginePort, GenerationError, SpeechEnginePort,
    SynthesisError, TranscodeError, TranscriptionEnginePort, TranscriptionError,
    CANONICAL_FORMAT,
};
use crate::domain::TranscriptText;
use crate::infrastructure::adapters::transcoder::{inspect_wav, pcm_silence};

/// 固定输出时长（毫秒）
const FAKE_AUDIO_MS: u32 = 500;

fn canonical_silence() -> Vec<u8> {
    pcm_silence(
        CANONICAL_FORMAT.sample_rate,
        CANONICAL_FORMAT.channels as u16,
        CANONICAL_FORMAT.bits_per_sample,
        FAKE_AUDIO_MS,
    )
}

/// 可取消的等待，返回 false 表示被取消
async fn pause(delay: Option<Duration>, cancel: &CancellationToken) -> bool {
    let Some(delay) = delay else {
        return true;
    };
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

// ============================================================================
// Transcoder
// ============================================================================

/// Fake 转码器：写出一段固定的规范静音 WAV
pub struct FakeTranscoder {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeTranscoder {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// 模拟 ffmpeg 写了一半输出后非零退出
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FakeTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioTranscoderPort for FakeTranscoder {
    async fn to_canonical(
        &self,
        _input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<AudioInfo, TranscodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(TranscodeError::Cancelled);
        }
        let wav = canonical_silence();
        if self.fail {
            tokio::fs::write(output, &wav[..wav.len().min(44)])
                .await
                .map_err(|e| TranscodeError::IoError(e.to_string()))?;
            return Err(TranscodeError::Failed {
                code: Some(1),
                detail: "fake transcoder failure".to_string(),
            });
        }

        tokio::fs::write(output, &wav)
            .await
            .map_err(|e| TranscodeError::IoError(e.to_string()))?;
        inspect_wav(&wav)
    }
}

// ============================================================================
// Transcriber
// ============================================================================

enum TranscriberBehavior {
    Text(String),
    Timeout,
}

/// Fake 转写引擎：返回固定文本
pub struct FakeTranscriber {
    behavior: TranscriberBehavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            behavior: TranscriberBehavior::Text(text.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// 模拟超出墙钟超时
    pub fn timing_out() -> Self {
        Self {
            behavior: TranscriberBehavior::Timeout,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionEnginePort for FakeTranscriber {
    async fn transcribe(
        &self,
        _wav_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<TranscriptText, TranscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !pause(self.delay, cancel).await {
            return Err(TranscriptionError::Cancelled);
        }

        match &self.behavior {
            TranscriberBehavior::Text(text) => Ok(TranscriptText::new(text)),
            TranscriberBehavior::Timeout => {
                Err(TranscriptionError::Timeout(Duration::from_secs(60)))
            }
        }
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Fake 生成引擎：返回固定回复
pub struct FakeGenerationEngine {
    reply: Option<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
    intervals: Mutex<Vec<(Instant, Instant)>>,
}

impl FakeGenerationEngine {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
            intervals: Mutex::new(Vec::new()),
        }
    }

    /// 模拟引擎报错
    pub fn failing() -> Self {
        Self {
            reply: None,
            ..Self::new("")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// 收到的提示词
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// 每次调用的 (开始, 结束) 时间
    pub fn intervals(&self) -> Vec<(Instant, Instant)> {
        self.intervals.lock().map(|i| i.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerationEnginePort for FakeGenerationEngine {
    async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, GenerationError> {
        let started = Instant::now();
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Ok(mut intervals) = self.intervals.lock() {
            intervals.push((started, Instant::now()));
        }

        self.reply
            .clone()
            .ok_or_else(|| GenerationError::Engine("fake generation failure".to_string()))
    }
}

// ============================================================================
// Speech
// ============================================================================

/// Fake 合成引擎：写出一段静音 WAV
pub struct FakeSpeechEngine {
    fail: bool,
    delay: Option<Duration>,
    spoken: Mutex<Vec<String>>,
}

impl FakeSpeechEngine {
    pub fn new() -> Self {
        Self {
            fail: false,
            delay: None,
            spoken: Mutex::new(Vec::new()),
        }
    }

    /// 写出半个文件后报错
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 成功合成过的文本
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for FakeSpeechEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechEnginePort for FakeSpeechEngine {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let wav = canonical_silence();
        if self.fail {
            let _ = tokio::fs::write(output, &wav[..wav.len() / 2]).await;
            return Err(SynthesisError::Failed("fake synthesis failure".to_string()));
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        tokio::fs::write(output, &wav)
            .await
            .map_err(|e| SynthesisError::Storage(e.to_string()))?;
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(text.to_string());
        }
        Ok(())
    }
}
