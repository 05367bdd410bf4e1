//! Audio Storage Port - 出站端口
//!
//! 合成音频的存储与保留策略。合成音频要在轮次结束后继续提供下载，
//! 所以不走请求级临时文件，而是由保留策略定期清理。

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// 音频存储错误
#[derive(Debug, Error)]
pub enum AudioStorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// 保留策略
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// 超过该时长的文件被删除
    pub max_age: Duration,
    /// 最大存储空间（字节），超出后按 LRU 清理；0 表示不限制
    pub max_storage_bytes: u64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(3600),      // 1 小时
            max_storage_bytes: 1024 * 1024 * 1024, // 1 GB
        }
    }
}

/// 新分配的音频文件
#[derive(Debug, Clone)]
pub struct StoredAudio {
    /// 唯一文件名（uuid + 固定扩展名）
    pub file_name: String,
    /// 服务目录下的完整路径
    pub path: PathBuf,
}

/// 存储统计
#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    /// 已使用空间（字节）
    pub used_bytes: u64,
    /// 文件数量
    pub file_count: u64,
}

/// GC 结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcResult {
    /// 删除的文件数量
    pub deleted_files: u64,
    /// 释放的空间（字节）
    pub freed_bytes: u64,
}

impl GcResult {
    pub fn merge(&mut self, other: GcResult) {
        self.deleted_files += other.deleted_files;
        self.freed_bytes += other.freed_bytes;
    }
}

/// Audio Storage Port - 出站端口
#[async_trait]
pub trait AudioStoragePort: Send + Sync {
    /// 分配一个不冲突的文件名（服务目录不存在时自动创建）
    async fn allocate(&self) -> Result<StoredAudio, AudioStorageError>;

    /// 获取音频文件路径
    fn audio_path(&self, file_name: &str) -> Result<PathBuf, AudioStorageError>;

    /// 删除音频文件
    async fn delete_audio(&self, file_name: &str) -> Result<(), AudioStorageError>;

    /// 检查音频是否存在
    async fn audio_exists(&self, file_name: &str) -> bool;

    /// 获取存储统计
    async fn get_stats(&self) -> Result<StorageStats, AudioStorageError>;

    /// 按保留策略清理：先按时长，再按容量
    async fn gc(&self, policy: &RetentionPolicy) -> Result<GcResult, AudioStorageError>;

    /// 按 LRU 清理到指定空间
    async fn evict_to_size(&self, target_bytes: u64) -> Result<GcResult, AudioStorageError>;
}
