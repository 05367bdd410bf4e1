//! Turn Handlers - 轮次编排
//!
//! 上传 → 临时文件 → 转码 → 转写 →（非空）提示词 → 生成（准入控制）
//! → 解析 → 清洗 → 合成 → 组装回复 → 清理（无论结果如何）
//!
//! 任何阶段都不重试：外部进程失败只报告一次，由用户重新提交。

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::admission::EngineAdmissionController;
use crate::application::commands::{TextTurnCommand, TurnOutcome, VoiceTurnCommand};
use crate::application::error::{advisory, TurnError};
use crate::application::ports::{
    AudioTranscoderPort, GenerationEnginePort, TempFilePort, TempKind, TranscodeError,
    TranscriptionEnginePort,
};
use crate::domain::{
    build_tutor_prompt, parse_tutor_response, SectionLayout, TranscriptText, TurnId, TurnPath,
    TurnReply, TurnState, TurnTrace,
};

use super::SpeechSynthesizer;

/// 编排器配置
#[derive(Debug, Clone)]
pub struct TurnOrchestratorConfig {
    /// 生成的最大 token 数
    pub max_tokens: u32,
    /// 生成调用的截止时间
    pub generation_timeout: Duration,
}

impl Default for TurnOrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            generation_timeout: Duration::from_secs(120),
        }
    }
}

/// TurnOrchestrator
///
/// 语音轮次和文本轮次共用同一条状态机，文本轮次只是跳过转码和转写
pub struct TurnOrchestrator {
    config: TurnOrchestratorConfig,
    temp_files: Arc<dyn TempFilePort>,
    transcoder: Arc<dyn AudioTranscoderPort>,
    transcriber: Arc<dyn TranscriptionEnginePort>,
    generator: Arc<dyn GenerationEnginePort>,
    synthesizer: Arc<SpeechSynthesizer>,
    admission: Arc<EngineAdmissionController>,
}

impl TurnOrchestrator {
    pub fn new(
        config: TurnOrchestratorConfig,
        temp_files: Arc<dyn TempFilePort>,
        transcoder: Arc<dyn AudioTranscoderPort>,
        transcriber: Arc<dyn TranscriptionEnginePort>,
        generator: Arc<dyn GenerationEnginePort>,
        synthesizer: Arc<SpeechSynthesizer>,
        admission: Arc<EngineAdmissionController>,
    ) -> Self {
        Self {
            config,
            temp_files,
            transcoder,
            transcriber,
            generator,
            synthesizer,
            admission,
        }
    }

    /// 语音轮次
    pub async fn handle_voice(&self, command: VoiceTurnCommand) -> Result<TurnOutcome, TurnError> {
        let mut trace = TurnTrace::new(TurnId::new());

        tracing::info!(
            turn_id = %trace.turn_id(),
            audio_size = command.upload.len(),
            content_type = ?command.upload.content_type,
            "Voice turn received"
        );

        // 临时文件都在 run_voice_turn 内部，返回前已全部清理
        let result = self.run_voice_turn(&mut trace, command).await;
        finish(&mut trace, &result);
        result
    }

    /// 文本轮次
    pub async fn handle_text(&self, command: TextTurnCommand) -> Result<TurnOutcome, TurnError> {
        let mut trace = TurnTrace::new(TurnId::new());

        tracing::info!(
            turn_id = %trace.turn_id(),
            message_len = command.message.len(),
            "Text turn received"
        );

        trace.advance(TurnState::Transcribed);
        let transcript = TranscriptText::new(&command.message);
        let result = self.respond(&mut trace, transcript, &command.cancel).await;
        finish(&mut trace, &result);
        result
    }

    async fn run_voice_turn(
        &self,
        trace: &mut TurnTrace,
        command: VoiceTurnCommand,
    ) -> Result<TurnOutcome, TurnError> {
        let VoiceTurnCommand { upload, cancel } = command;
        let turn_id = trace.turn_id();

        if upload.is_empty() {
            return Err(TranscodeError::InvalidInput("empty upload".to_string()).into());
        }

        // 先登记，再写入
        let input = self
            .temp_files
            .acquire(TempKind::Upload, upload.extension())
            .await?;
        tokio::fs::write(input.path(), &upload.bytes)
            .await
            .map_err(TurnError::storage)?;
        drop(upload);

        let canonical = self.temp_files.acquire(TempKind::Canonical, "wav").await?;

        let info = self
            .transcoder
            .to_canonical(input.path(), canonical.path(), &cancel)
            .await?;
        trace.advance(TurnState::Transcoded);

        tracing::debug!(
            turn_id = %turn_id,
            duration_ms = info.duration_ms,
            data_size = info.data_size,
            "Audio transcoded"
        );

        let transcript = {
            let _permit = self.admission.admit_transcription(&cancel).await?;
            self.transcriber.transcribe(canonical.path(), &cancel).await?
        };
        trace.advance(TurnState::Transcribed);

        // 转写完成后音频就不再需要了
        input.release();
        canonical.release();

        tracing::info!(
            turn_id = %turn_id,
            chars = transcript.char_count(),
            transcript = %transcript,
            "Audio transcribed"
        );

        self.respond(trace, transcript, &cancel).await
    }

    /// 转写之后的公共部分：提示词 → 生成 → 解析 → 合成
    async fn respond(
        &self,
        trace: &mut TurnTrace,
        transcript: TranscriptText,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        let turn_id = trace.turn_id();

        if transcript.is_empty() {
            trace.advance(TurnState::EmptyTranscript);
            return Ok(TurnOutcome::Advisory(advisory::EMPTY_INPUT));
        }

        let prompt = build_tutor_prompt(transcript.as_str());
        let output = self.generate(&prompt, cancel).await?;
        trace.advance(TurnState::Generated);

        let output = output.trim();
        if output.is_empty() {
            tracing::warn!(turn_id = %turn_id, "Model returned no text");
            trace.advance(TurnState::EmptyTranscript);
            return Ok(TurnOutcome::Advisory(advisory::EMPTY_INPUT));
        }

        let parsed = parse_tutor_response(output);
        trace.advance(TurnState::Parsed);

        tracing::debug!(
            turn_id = %turn_id,
            layout = SectionLayout::detect(output).map(|l| l.name).unwrap_or("unstructured"),
            speakable_len = parsed.speakable_text.len(),
            "Model output parsed"
        );

        let audio_url = self
            .synthesizer
            .synthesize_for_turn(turn_id, &parsed.speakable_text)
            .await;
        if audio_url.is_some() {
            trace.advance(TurnState::Synthesized);
        }

        Ok(TurnOutcome::Replied(TurnReply {
            response: parsed.full_text,
            audio_url,
        }))
    }

    /// 生成调用：准入控制 + 截止时间 + 取消
    async fn generate(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, TurnError> {
        let _permit = self.admission.admit_generation(cancel).await?;
        let deadline = self.config.generation_timeout;

        tokio::select! {
            _ = cancel.cancelled() => Err(TurnError::Cancelled),
            result = tokio::time::timeout(deadline, self.generator.generate(prompt, self.config.max_tokens)) => {
                match result {
                    Ok(output) => output.map_err(TurnError::from),
                    Err(_) => Err(TurnError::GenerationTimeout(deadline)),
                }
            }
        }
    }
}

/// 进入 Completed 并记录失败
fn finish(trace: &mut TurnTrace, result: &Result<TurnOutcome, TurnError>) {
    let path = match result {
        Ok(TurnOutcome::Replied(_)) => TurnPath::Replied,
        Ok(TurnOutcome::Advisory(_)) => TurnPath::Advisory,
        Err(e) => {
            tracing::error!(
                turn_id = %trace.turn_id(),
                stage = e.stage(),
                error = %e,
                "Turn failed"
            );
            TurnPath::Failed
        }
    };
    trace.complete(path);
}
