//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（转码、转写、生成、合成、存储、临时文件）
//! - admission: 重量级引擎准入控制
//! - commands: 轮次命令及处理器（TurnOrchestrator、SpeechSynthesizer）
//! - error: 轮次错误分类与提示语

pub mod admission;
pub mod commands;
pub mod error;
pub mod ports;

// Re-exports
pub use admission::{
    AdmissionError, AdmissionGate, AdmissionPermit, AdmissionStats, EngineAdmissionController,
    GateStats,
};
pub use commands::{
    handlers::{
        SpeechSynthesizer, SpeechSynthesizerConfig, TurnOrchestrator, TurnOrchestratorConfig,
    },
    SpeakTextCommand, TextTurnCommand, TurnOutcome, VoiceTurnCommand,
};
pub use error::{advisory, TurnError};
