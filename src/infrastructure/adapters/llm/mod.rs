//! LLM Adapter - llama.cpp server 客户端

mod llama_server_client;

pub use llama_server_client::{LlamaServerClient, LlamaServerClientConfig};
