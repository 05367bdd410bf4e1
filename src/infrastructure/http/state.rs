//! Application State

use std::path::PathBuf;
use std::sync::Arc;

use crate::application::{EngineAdmissionController, SpeechSynthesizer, TurnOrchestrator};

/// 应用状态
pub struct AppState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub synthesizer: Arc<SpeechSynthesizer>,
    pub admission: Arc<EngineAdmissionController>,
    /// 合成音频目录，挂载在 /audio
    pub audio_dir: PathBuf,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<TurnOrchestrator>,
        synthesizer: Arc<SpeechSynthesizer>,
        admission: Arc<EngineAdmissionController>,
        audio_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            orchestrator,
            synthesizer,
            admission,
            audio_dir: audio_dir.into(),
        }
    }
}
