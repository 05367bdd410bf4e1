//! TTS Adapter - Piper 命令行合成

mod piper_engine;

pub use piper_engine::{PiperEngine, PiperEngineConfig};
