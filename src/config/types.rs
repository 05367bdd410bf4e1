//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 转码器（ffmpeg）配置
    #[serde(default)]
    pub transcoder: TranscoderConfig,

    /// 语音转写（whisper.cpp）配置
    #[serde(default)]
    pub stt: SttConfig,

    /// 语言模型（llama.cpp server）配置
    #[serde(default)]
    pub llm: LlmConfig,

    /// 语音合成（Piper）配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 准入控制配置
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// 合成音频保留策略
    #[serde(default)]
    pub retention: RetentionConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 公开访问的 Base URL（音频链接使用）
    /// 如果未设置，则使用 http://{host}:{port}
    #[serde(default)]
    pub base_url: Option<String>,

    /// 上传文件最大大小（字节），默认 10MB
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_size() -> u64 {
    10 * 1024 * 1024 // 10 MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
            max_upload_size: default_max_upload_size(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 获取公开的 Base URL
    pub fn public_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            let host = if self.host == "0.0.0.0" {
                "127.0.0.1"
            } else {
                &self.host
            };
            format!("http://{}:{}", host, self.port)
        })
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 请求级临时文件目录
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// 合成音频目录（通过 /audio 提供下载）
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("temp/audio")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            audio_dir: default_audio_dir(),
        }
    }
}

/// 转码器配置
#[derive(Debug, Clone, Deserialize)]
pub struct TranscoderConfig {
    /// ffmpeg 可执行文件
    #[serde(default = "default_ffmpeg")]
    pub binary: PathBuf,

    /// 墙钟超时（秒）
    #[serde(default = "default_transcode_timeout")]
    pub timeout_secs: u64,
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_transcode_timeout() -> u64 {
    10
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            binary: default_ffmpeg(),
            timeout_secs: default_transcode_timeout(),
        }
    }
}

impl TranscoderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 语音转写配置
#[derive(Debug, Clone, Deserialize)]
pub struct SttConfig {
    /// whisper-cli 可执行文件
    #[serde(default = "default_whisper")]
    pub binary: PathBuf,

    /// ggml 模型文件
    #[serde(default = "default_whisper_model")]
    pub model: PathBuf,

    /// 识别语言，"auto" 为自动检测
    #[serde(default = "default_language")]
    pub language: String,

    /// 墙钟超时（秒）
    #[serde(default = "default_stt_timeout")]
    pub timeout_secs: u64,
}

fn default_whisper() -> PathBuf {
    PathBuf::from("whisper-cli")
}

fn default_whisper_model() -> PathBuf {
    PathBuf::from("models/ggml-small.bin")
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_stt_timeout() -> u64 {
    60
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            binary: default_whisper(),
            model: default_whisper_model(),
            language: default_language(),
            timeout_secs: default_stt_timeout(),
        }
    }
}

impl SttConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 语言模型配置
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// llama-server 基础 URL
    #[serde(default = "default_llm_url")]
    pub url: String,

    /// 最大输出 token 数
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// 生成截止时间（秒）
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_max_tokens() -> u32 {
    200
}

fn default_llm_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 语音合成配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    /// 是否启用合成
    #[serde(default = "default_tts_enabled")]
    pub enabled: bool,

    /// piper 可执行文件
    #[serde(default = "default_piper")]
    pub binary: PathBuf,

    /// onnx 声音模型
    #[serde(default = "default_piper_model")]
    pub model: PathBuf,

    /// 合成截止时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,
}

fn default_tts_enabled() -> bool {
    true
}

fn default_piper() -> PathBuf {
    PathBuf::from("piper")
}

fn default_piper_model() -> PathBuf {
    PathBuf::from("models/tts/en_US-lessac-medium.onnx")
}

fn default_tts_timeout() -> u64 {
    30
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: default_tts_enabled(),
            binary: default_piper(),
            model: default_piper_model(),
            timeout_secs: default_tts_timeout(),
        }
    }
}

impl TtsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 准入控制配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdmissionConfig {
    /// 每个引擎闸门的最大等待者数量，0 表示不限制
    #[serde(default)]
    pub max_queue_depth: usize,
}

/// 合成音频保留配置
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// 是否启用定期清理
    #[serde(default = "default_retention_enabled")]
    pub enabled: bool,

    /// 清理间隔（秒）
    #[serde(default = "default_retention_interval")]
    pub interval_secs: u64,

    /// 音频最长保留时间（秒）
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,

    /// 最大存储空间（字节），0 表示不限制
    #[serde(default = "default_max_storage")]
    pub max_storage_bytes: u64,
}

fn default_retention_enabled() -> bool {
    true
}

fn default_retention_interval() -> u64 {
    300 // 5 分钟
}

fn default_max_age() -> u64 {
    3600 // 1 小时
}

fn default_max_storage() -> u64 {
    1024 * 1024 * 1024 // 1 GB
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: default_retention_enabled(),
            interval_secs: default_retention_interval(),
            max_age_secs: default_max_age(),
            max_storage_bytes: default_max_storage(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
