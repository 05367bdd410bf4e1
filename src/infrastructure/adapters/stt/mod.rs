//! STT Adapter - whisper.cpp 命令行转写

mod whisper_cli;

pub use whisper_cli::{WhisperCli, WhisperCliConfig};
