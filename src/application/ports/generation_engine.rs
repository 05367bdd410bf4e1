//! Generation Engine Port - 语言模型抽象
//!
//! 具体实现在 infrastructure/adapters/llm

use async_trait::async_trait;
use thiserror::Error;

/// 生成错误
#[derive(Debug, Error)]
pub enum GenerationError {
    /// 引擎未加载或无法连接
    #[error("Generation engine unavailable: {0}")]
    Unavailable(String),

    #[error("Generation engine error: {0}")]
    Engine(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Generation Engine Port
///
/// 单实例重量级引擎，调用方必须先通过准入控制
#[async_trait]
pub trait GenerationEnginePort: Send + Sync {
    /// 生成补全文本
    ///
    /// # Arguments
    /// * `prompt` - 完整提示词
    /// * `max_tokens` - 最大输出 token 数
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError>;

    /// 检查引擎是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
