//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod fake;
pub mod llm;
pub mod process;
pub mod storage;
pub mod stt;
pub mod transcoder;
pub mod tts;

pub use fake::*;
pub use llm::*;
pub use storage::*;
pub use stt::*;
pub use transcoder::*;
pub use tts::*;
