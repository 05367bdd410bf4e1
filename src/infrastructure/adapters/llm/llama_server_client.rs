//! Llama Server Client - 调用 llama.cpp `llama-server` 的补全接口
//!
//! 模型常驻在 llama-server 进程里，这里只做 HTTP 调用：
//!
//! POST {url}/completion
//! Request: {"prompt": "...", "n_predict": 200, "stream": false}
//! Response: {"content": "...", ...}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{GenerationEnginePort, GenerationError};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
}

/// Llama Server 客户端配置
#[derive(Debug, Clone)]
pub struct LlamaServerClientConfig {
    /// llama-server 基础 URL
    pub base_url: String,
    /// 请求超时（秒），作为轮次截止时间之外的兜底
    pub timeout_secs: u64,
}

impl Default for LlamaServerClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 120,
        }
    }
}

impl LlamaServerClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Llama Server 客户端
pub struct LlamaServerClient {
    client: Client,
    config: LlamaServerClientConfig,
}

impl LlamaServerClient {
    pub fn new(config: LlamaServerClientConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn completion_url(&self) -> String {
        format!("{}/completion", self.config.base_url.trim_end_matches('/'))
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl GenerationEnginePort for LlamaServerClient {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        let request = CompletionRequest {
            prompt,
            n_predict: max_tokens,
            stream: false,
        };

        tracing::debug!(
            url = %self.completion_url(),
            prompt_len = prompt.len(),
            max_tokens = max_tokens,
            "Sending completion request"
        );

        let response = self
            .client
            .post(self.completion_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    GenerationError::Unavailable(format!("Cannot connect to llama-server: {}", e))
                } else {
                    GenerationError::Engine(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            // 模型仍在加载
            return Err(GenerationError::Unavailable(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Engine(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        tracing::info!(output_len = body.content.len(), "Completion received");

        Ok(body.content)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
