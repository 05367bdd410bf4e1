//! Fake Engines - 不依赖外部进程和模型的引擎实现
//!
//! 用于测试：调用计数、注入延迟、记录执行区间

mod fake_engines;

pub use fake_engines::{FakeGenerationEngine, FakeSpeechEngine, FakeTranscoder, FakeTranscriber};
