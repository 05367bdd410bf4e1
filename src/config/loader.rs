//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `VAANI_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `VAANI_SERVER__PORT=8000`
/// - `VAANI_STT__MODEL=/models/ggml-small.bin`
/// - `VAANI_LLM__URL=http://127.0.0.1:8080`
/// - `VAANI_ADMISSION__MAX_QUEUE_DEPTH=4`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8000)?
        .set_default("server.max_upload_size", 10 * 1024 * 1024)?
        .set_default("storage.temp_dir", "temp")?
        .set_default("storage.audio_dir", "temp/audio")?
        .set_default("transcoder.binary", "ffmpeg")?
        .set_default("transcoder.timeout_secs", 10)?
        .set_default("stt.binary", "whisper-cli")?
        .set_default("stt.model", "models/ggml-small.bin")?
        .set_default("stt.language", "auto")?
        .set_default("stt.timeout_secs", 60)?
        .set_default("llm.url", "http://127.0.0.1:8080")?
        .set_default("llm.max_tokens", 200)?
        .set_default("llm.timeout_secs", 120)?
        .set_default("tts.enabled", true)?
        .set_default("tts.binary", "piper")?
        .set_default("tts.model", "models/tts/en_US-lessac-medium.onnx")?
        .set_default("tts.timeout_secs", 30)?
        .set_default("admission.max_queue_depth", 0)?
        .set_default("retention.enabled", true)?
        .set_default("retention.interval_secs", 300)?
        .set_default("retention.max_age_secs", 3600)?
        .set_default("retention.max_storage_bytes", 1024_u64 * 1024 * 1024)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: VAANI_TTS__ENABLED=false
    builder = builder.add_source(
        Environment::with_prefix("VAANI")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("Server port cannot be 0"));
    }

    if config.transcoder.binary.as_os_str().is_empty() {
        return Err(invalid("Transcoder binary cannot be empty"));
    }
    if config.stt.binary.as_os_str().is_empty() {
        return Err(invalid("STT binary cannot be empty"));
    }
    if config.stt.model.as_os_str().is_empty() {
        return Err(invalid("STT model path cannot be empty"));
    }
    if config.stt.language.trim().is_empty() {
        return Err(invalid("STT language cannot be empty (use \"auto\")"));
    }
    if config.llm.url.is_empty() {
        return Err(invalid("LLM URL cannot be empty"));
    }
    if config.tts.enabled
        && (config.tts.binary.as_os_str().is_empty() || config.tts.model.as_os_str().is_empty())
    {
        return Err(invalid("TTS binary and model cannot be empty when TTS is enabled"));
    }

    let timeouts = [
        ("transcoder.timeout_secs", config.transcoder.timeout_secs),
        ("stt.timeout_secs", config.stt.timeout_secs),
        ("llm.timeout_secs", config.llm.timeout_secs),
        ("tts.timeout_secs", config.tts.timeout_secs),
    ];
    if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
        return Err(ConfigError::ValidationError(format!("{} cannot be 0", name)));
    }

    if config.llm.max_tokens == 0 {
        return Err(invalid("LLM max_tokens cannot be 0"));
    }

    if config.retention.enabled && config.retention.interval_secs == 0 {
        return Err(invalid("Retention interval cannot be 0 when retention is enabled"));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("Public Base URL: {}", config.server.public_base_url());
    tracing::info!("Max Upload Size: {} bytes", config.server.max_upload_size);
    tracing::info!("Temp Directory: {:?}", config.storage.temp_dir);
    tracing::info!("Audio Directory: {:?}", config.storage.audio_dir);
    tracing::info!(
        "Transcoder: {:?} (timeout {}s)",
        config.transcoder.binary,
        config.transcoder.timeout_secs
    );
    tracing::info!(
        "STT: {:?} model={:?} language={} (timeout {}s)",
        config.stt.binary,
        config.stt.model,
        config.stt.language,
        config.stt.timeout_secs
    );
    tracing::info!(
        "LLM: {} max_tokens={} (timeout {}s)",
        config.llm.url,
        config.llm.max_tokens,
        config.llm.timeout_secs
    );
    tracing::info!("TTS Enabled: {}", config.tts.enabled);
    if config.tts.enabled {
        tracing::info!(
            "TTS: {:?} model={:?} (timeout {}s)",
            config.tts.binary,
            config.tts.model,
            config.tts.timeout_secs
        );
    }
    tracing::info!(
        "Admission Max Queue Depth: {}",
        config.admission.max_queue_depth
    );
    tracing::info!("Retention Enabled: {}", config.retention.enabled);
    if config.retention.enabled {
        tracing::info!("Retention Interval: {}s", config.retention.interval_secs);
        tracing::info!("Retention Max Age: {}s", config.retention.max_age_secs);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
