//! Vaani - 口语导师语音轮次服务
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Turn Context: 轮次状态机、提示词、回复解析、语音文本清洗
//!
//! 应用层 (application/):
//! - Ports: 端口定义（转码、转写、生成、合成、音频存储、临时文件）
//! - Admission: 重量级引擎准入控制
//! - Commands: 轮次编排、语音合成
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: /voice-chat, /chat, /tts, /audio
//! - Worker: 合成音频保留策略
//! - Adapters: ffmpeg, whisper-cli, llama-server, piper, 文件存储

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
