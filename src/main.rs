//! Vaani - 口语导师语音轮次服务

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vaani::application::ports::{
    AudioStoragePort, GenerationEnginePort, RetentionPolicy, SpeechEnginePort,
};
use vaani::application::{
    EngineAdmissionController, SpeechSynthesizer, SpeechSynthesizerConfig, TurnOrchestrator,
    TurnOrchestratorConfig,
};
use vaani::config::{load_config, print_config, AppConfig};
use vaani::infrastructure::adapters::{
    FfmpegTranscoder, FfmpegTranscoderConfig, FileAudioStorage, LlamaServerClient,
    LlamaServerClientConfig, LocalTempStore, PiperEngine, PiperEngineConfig, WhisperCli,
    WhisperCliConfig,
};
use vaani::infrastructure::http::{AppState, HttpServer, ServerConfig};
use vaani::infrastructure::{RetentionWorker, RetentionWorkerConfig};

fn init_logging(config: &AppConfig) {
    let log_filter = format!(
        "{},vaani={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// 加载 TTS 引擎，失败时返回 None（/tts 回 "TTS model not loaded"）
fn load_speech_engine(config: &AppConfig) -> Option<Arc<dyn SpeechEnginePort>> {
    if !config.tts.enabled {
        tracing::info!("TTS disabled by configuration");
        return None;
    }

    let engine = PiperEngine::load(PiperEngineConfig {
        binary: config.tts.binary.clone(),
        model: config.tts.model.clone(),
        timeout: config.tts.timeout(),
    })?;
    Some(Arc::new(engine))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_logging(&config);

    tracing::info!("Vaani - spoken English tutor");
    print_config(&config);

    // 确保目录存在
    tokio::fs::create_dir_all(&config.storage.temp_dir).await?;
    tokio::fs::create_dir_all(&config.storage.audio_dir).await?;

    // 存储
    let storage = Arc::new(FileAudioStorage::new(&config.storage.audio_dir).await?);
    let temp_files = Arc::new(LocalTempStore::new(&config.storage.temp_dir));

    // 引擎
    let transcoder = Arc::new(FfmpegTranscoder::new(FfmpegTranscoderConfig {
        binary: config.transcoder.binary.clone(),
        timeout: config.transcoder.timeout(),
    }));

    let transcriber = WhisperCli::new(WhisperCliConfig {
        binary: config.stt.binary.clone(),
        model: config.stt.model.clone(),
        language: config.stt.language.clone(),
        timeout: config.stt.timeout(),
    });
    if !transcriber.model_exists() {
        tracing::warn!(
            model = %config.stt.model.display(),
            "Whisper model not found, voice turns will fail until it is installed"
        );
    }
    let transcriber = Arc::new(transcriber);

    let generator = Arc::new(LlamaServerClient::new(
        LlamaServerClientConfig::new(&config.llm.url).with_timeout(config.llm.timeout_secs),
    )?);
    if generator.health_check().await {
        tracing::info!(url = %config.llm.url, "llama-server is ready");
    } else {
        tracing::warn!(
            url = %config.llm.url,
            "llama-server is not reachable yet, turns will report the model as unavailable"
        );
    }

    let speech_engine = load_speech_engine(&config);

    // 应用层
    let admission = Arc::new(EngineAdmissionController::new(
        config.admission.max_queue_depth,
    ));

    let audio_storage: Arc<dyn AudioStoragePort> = storage.clone();
    let synthesizer = Arc::new(SpeechSynthesizer::new(
        SpeechSynthesizerConfig {
            base_url: config.server.public_base_url(),
            timeout: config.tts.timeout(),
        },
        speech_engine,
        audio_storage.clone(),
    ));

    let orchestrator = Arc::new(TurnOrchestrator::new(
        TurnOrchestratorConfig {
            max_tokens: config.llm.max_tokens,
            generation_timeout: config.llm.timeout(),
        },
        temp_files,
        transcoder,
        transcriber,
        generator,
        synthesizer.clone(),
        admission.clone(),
    ));

    // 保留策略 Worker
    let shutdown = CancellationToken::new();
    if config.retention.enabled {
        let worker = RetentionWorker::new(
            RetentionWorkerConfig {
                interval: Duration::from_secs(config.retention.interval_secs),
                policy: RetentionPolicy {
                    max_age: Duration::from_secs(config.retention.max_age_secs),
                    max_storage_bytes: config.retention.max_storage_bytes,
                },
            },
            audio_storage,
        );
        tokio::spawn(worker.run(shutdown.clone()));
    }

    // HTTP 服务器
    let server_config = ServerConfig::new(&config.server.host, config.server.port)
        .with_max_upload_size(config.server.max_upload_size as usize);
    let state = AppState::new(
        orchestrator,
        synthesizer,
        admission,
        config.storage.audio_dir.clone(),
    );
    let server = HttpServer::new(server_config, state);

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    let worker_shutdown = shutdown.clone();
    server
        .run_with_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
            worker_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    tracing::info!("Server shutdown complete");

    Ok(())
}
