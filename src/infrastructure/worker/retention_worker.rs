//! Retention Worker - 合成音频定期清理
//!
//! 合成音频要在轮次结束后继续提供下载，不能随请求删除。
//! 这里按固定间隔执行保留策略：先删过期文件，再按 LRU 收缩到容量上限。

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{AudioStoragePort, GcResult, RetentionPolicy};

/// Worker 配置
#[derive(Debug, Clone)]
pub struct RetentionWorkerConfig {
    /// 清理间隔
    pub interval: Duration,
    /// 保留策略
    pub policy: RetentionPolicy,
}

impl Default for RetentionWorkerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            policy: RetentionPolicy::default(),
        }
    }
}

/// 保留策略 Worker
pub struct RetentionWorker {
    config: RetentionWorkerConfig,
    storage: Arc<dyn AudioStoragePort>,
}

impl RetentionWorker {
    pub fn new(config: RetentionWorkerConfig, storage: Arc<dyn AudioStoragePort>) -> Self {
        Self { config, storage }
    }

    /// 执行一次清理，失败只记日志
    pub async fn run_once(&self) -> GcResult {
        match self.storage.gc(&self.config.policy).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Audio retention pass failed");
                GcResult::default()
            }
        }
    }

    /// 启动 Worker，直到 shutdown 被触发
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            max_age_secs = self.config.policy.max_age.as_secs(),
            max_storage_bytes = self.config.policy.max_storage_bytes,
            "RetentionWorker started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let result = self.run_once().await;
                    tracing::debug!(
                        deleted_files = result.deleted_files,
                        freed_bytes = result.freed_bytes,
                        "Retention pass finished"
                    );
                }
            }
        }

        tracing::info!("RetentionWorker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::FileAudioStorage;
    use std::time::SystemTime;
    use tempfile::tempdir;

    async fn aged_file(storage: &FileAudioStorage, age: Duration) -> String {
        let stored = storage.allocate().await.unwrap();
        std::fs::write(&stored.path, b"RIFF....WAVE").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&stored.path)
            .unwrap()
            .set_modified(SystemTime::now() - age)
            .unwrap();
        stored.file_name
    }

    #[tokio::test]
    async fn test_run_once_applies_policy() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(FileAudioStorage::new(dir.path()).await.unwrap());
        let old = aged_file(&storage, Duration::from_secs(7200)).await;
        let fresh = aged_file(&storage, Duration::ZERO).await;

        let worker = RetentionWorker::new(RetentionWorkerConfig::default(), storage.clone());
        let result = worker.run_once().await;

        assert_eq!(result.deleted_files, 1);
        assert!(!storage.audio_exists(&old).await);
        assert!(storage.audio_exists(&fresh).await);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(FileAudioStorage::new(dir.path()).await.unwrap());
        let old = aged_file(&storage, Duration::from_secs(7200)).await;

        let worker = RetentionWorker::new(
            RetentionWorkerConfig {
                interval: Duration::from_millis(20),
                ..Default::default()
            },
            storage.clone(),
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(worker.run(shutdown.clone()));

        // 第一次 tick 立即触发
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!storage.audio_exists(&old).await);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
