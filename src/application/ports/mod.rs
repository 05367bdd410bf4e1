//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_storage;
mod audio_transcoder;
mod generation_engine;
mod speech_engine;
mod temp_files;
mod transcription_engine;

pub use audio_storage::{
    AudioStorageError, AudioStoragePort, GcResult, RetentionPolicy, StorageStats, StoredAudio,
};
pub use audio_transcoder::{
    AudioInfo, AudioTranscoderPort, CanonicalFormat, TranscodeError, CANONICAL_FORMAT,
};
pub use generation_engine::{GenerationEnginePort, GenerationError};
pub use speech_engine::{SpeechEnginePort, SynthesisError};
pub use temp_files::{release_path, TempFile, TempFileError, TempFilePort, TempKind};
pub use transcription_engine::{TranscriptionEnginePort, TranscriptionError};
