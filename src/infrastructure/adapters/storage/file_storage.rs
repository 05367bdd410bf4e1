//! File Storage - 文件系统音频存储实现
//!
//! 实现 AudioStoragePort trait。所有合成音频平铺在一个目录下，
//! 文件名为 `<uuid>.wav`，由 HTTP 层的静态文件服务直接提供下载。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use uuid::Uuid;

use crate::application::ports::{
    AudioStorageError, AudioStoragePort, GcResult, RetentionPolicy, StorageStats, StoredAudio,
};

const AUDIO_EXTENSION: &str = "wav";

/// 目录里的一个音频文件
#[derive(Debug)]
struct AudioEntry {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

/// 文件系统音频存储
pub struct FileAudioStorage {
    /// 存储根目录
    base_dir: PathBuf,
}

impl FileAudioStorage {
    /// 创建新的文件存储
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self, AudioStorageError> {
        let base_dir = base_dir.as_ref().to_path_buf();

        // 确保目录存在
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| AudioStorageError::IoError(e.to_string()))?;

        Ok(Self { base_dir })
    }

    /// 获取存储根目录
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// 列出目录下的所有音频文件
    async fn list_audio(&self) -> Result<Vec<AudioEntry>, AudioStorageError> {
        let mut entries = match fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AudioStorageError::IoError(e.to_string())),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AudioStorageError::IoError(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != AUDIO_EXTENSION) {
                continue;
            }
            // 列目录和读 metadata 之间文件可能已被删除
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            files.push(AudioEntry {
                path,
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        Ok(files)
    }

    /// 删除一批文件，单个失败只记日志
    async fn remove_entries(&self, entries: &[AudioEntry]) -> GcResult {
        let mut result = GcResult::default();
        for entry in entries {
            match fs::remove_file(&entry.path).await {
                Ok(()) => {
                    result.deleted_files += 1;
                    result.freed_bytes += entry.size;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        path = %entry.path.display(),
                        error = %e,
                        "Failed to delete audio during GC"
                    );
                }
            }
        }
        result
    }
}

/// 只接受 `[A-Za-z0-9_-]+.wav`，拒绝路径穿越
fn validate_name(file_name: &str) -> Result<(), AudioStorageError> {
    let valid = file_name
        .strip_suffix(".wav")
        .map_or(false, |stem| {
            !stem.is_empty()
                && stem
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        });

    if valid {
        Ok(())
    } else {
        Err(AudioStorageError::InvalidName(file_name.to_string()))
    }
}

#[async_trait]
impl AudioStoragePort for FileAudioStorage {
    async fn allocate(&self) -> Result<StoredAudio, AudioStorageError> {
        // 目录可能在运行期间被外部清理
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| AudioStorageError::IoError(e.to_string()))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), AUDIO_EXTENSION);
        let path = self.base_dir.join(&file_name);
        Ok(StoredAudio { file_name, path })
    }

    fn audio_path(&self, file_name: &str) -> Result<PathBuf, AudioStorageError> {
        validate_name(file_name)?;
        Ok(self.base_dir.join(file_name))
    }

    async fn delete_audio(&self, file_name: &str) -> Result<(), AudioStorageError> {
        let path = self.audio_path(file_name)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(file = %file_name, "Deleted audio");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AudioStorageError::IoError(e.to_string())),
        }
    }

    async fn audio_exists(&self, file_name: &str) -> bool {
        match self.audio_path(file_name) {
            Ok(path) => fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn get_stats(&self) -> Result<StorageStats, AudioStorageError> {
        let files = self.list_audio().await?;
        Ok(StorageStats {
            used_bytes: files.iter().map(|f| f.size).sum(),
            file_count: files.len() as u64,
        })
    }

    async fn gc(&self, policy: &RetentionPolicy) -> Result<GcResult, AudioStorageError> {
        let now = SystemTime::now();
        let expired: Vec<AudioEntry> = self
            .list_audio()
            .await?
            .into_iter()
            .filter(|f| {
                now.duration_since(f.modified)
                    .map_or(false, |age| age > policy.max_age)
            })
            .collect();

        let mut result = self.remove_entries(&expired).await;

        if policy.max_storage_bytes > 0 {
            result.merge(self.evict_to_size(policy.max_storage_bytes).await?);
        }

        if result.deleted_files > 0 {
            tracing::info!(
                deleted_files = result.deleted_files,
                freed_bytes = result.freed_bytes,
                "Audio GC finished"
            );
        }

        Ok(result)
    }

    async fn evict_to_size(&self, target_bytes: u64) -> Result<GcResult, AudioStorageError> {
        let mut files = self.list_audio().await?;
        let used: u64 = files.iter().map(|f| f.size).sum();

        if used <= target_bytes {
            return Ok(GcResult::default());
        }

        tracing::warn!(
            used_bytes = used,
            target_bytes = target_bytes,
            "Audio storage exceeds limit, evicting oldest files"
        );

        // 最久未修改的先删
        files.sort_by_key(|f| f.modified);
        let mut remaining = used;
        let victims: Vec<AudioEntry> = files
            .into_iter()
            .take_while(|f| {
                if remaining <= target_bytes {
                    return false;
                }
                remaining = remaining.saturating_sub(f.size);
                true
            })
            .collect();

        Ok(self.remove_entries(&victims).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn write_audio(storage: &FileAudioStorage, size: usize, age: Duration) -> String {
        let stored = storage.allocate().await.unwrap();
        std::fs::write(&stored.path, vec![0u8; size]).unwrap();
        let file = std::fs::File::options()
            .write(true)
            .open(&stored.path)
            .unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
        stored.file_name
    }

    #[tokio::test]
    async fn test_allocate_and_delete() {
        let temp_dir = tempdir().unwrap();
        let storage = FileAudioStorage::new(temp_dir.path()).await.unwrap();

        let stored = storage.allocate().await.unwrap();
        assert!(stored.file_name.ends_with(".wav"));
        assert_eq!(stored.path, storage.base_dir().join(&stored.file_name));
        assert!(!storage.audio_exists(&stored.file_name).await);

        std::fs::write(&stored.path, b"RIFF").unwrap();
        assert!(storage.audio_exists(&stored.file_name).await);

        storage.delete_audio(&stored.file_name).await.unwrap();
        assert!(!storage.audio_exists(&stored.file_name).await);
        // 再删一次不报错
        storage.delete_audio(&stored.file_name).await.unwrap();
    }

    #[tokio::test]
    async fn test_allocate_recreates_missing_dir() {
        let temp_dir = tempdir().unwrap();
        let base = temp_dir.path().join("audio");
        let storage = FileAudioStorage::new(&base).await.unwrap();
        std::fs::remove_dir(&base).unwrap();

        let stored = storage.allocate().await.unwrap();
        assert!(base.is_dir());
        assert_eq!(stored.path.parent().unwrap(), base);
    }

    #[tokio::test]
    async fn test_rejects_unsafe_names() {
        let temp_dir = tempdir().unwrap();
        let storage = FileAudioStorage::new(temp_dir.path()).await.unwrap();

        for name in ["../secret.wav", "a/b.wav", ".wav", "x.mp3", "", "..", "a b.wav"] {
            assert!(
                matches!(
                    storage.audio_path(name),
                    Err(AudioStorageError::InvalidName(_))
                ),
                "accepted {name:?}"
            );
            assert!(!storage.audio_exists(name).await);
        }
        assert!(storage
            .audio_path("3f1c2a9e-8d7b-4c6a-9e5f-0a1b2c3d4e5f.wav")
            .is_ok());
    }

    #[tokio::test]
    async fn test_stats_ignore_other_files() {
        let temp_dir = tempdir().unwrap();
        let storage = FileAudioStorage::new(temp_dir.path()).await.unwrap();

        write_audio(&storage, 100, Duration::ZERO).await;
        write_audio(&storage, 50, Duration::ZERO).await;
        std::fs::write(temp_dir.path().join("notes.txt"), b"ignored").unwrap();

        let stats = storage.get_stats().await.unwrap();
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.used_bytes, 150);
    }

    #[tokio::test]
    async fn test_gc_removes_expired_files() {
        let temp_dir = tempdir().unwrap();
        let storage = FileAudioStorage::new(temp_dir.path()).await.unwrap();

        let old = write_audio(&storage, 10, Duration::from_secs(7200)).await;
        let fresh = write_audio(&storage, 20, Duration::ZERO).await;

        let policy = RetentionPolicy {
            max_age: Duration::from_secs(3600),
            max_storage_bytes: 0,
        };
        let result = storage.gc(&policy).await.unwrap();

        assert_eq!(
            result,
            GcResult {
                deleted_files: 1,
                freed_bytes: 10
            }
        );
        assert!(!storage.audio_exists(&old).await);
        assert!(storage.audio_exists(&fresh).await);
    }

    #[tokio::test]
    async fn test_evict_oldest_first() {
        let temp_dir = tempdir().unwrap();
        let storage = FileAudioStorage::new(temp_dir.path()).await.unwrap();

        let oldest = write_audio(&storage, 100, Duration::from_secs(300)).await;
        let middle = write_audio(&storage, 100, Duration::from_secs(200)).await;
        let newest = write_audio(&storage, 100, Duration::from_secs(100)).await;

        let result = storage.evict_to_size(150).await.unwrap();
        assert_eq!(result.deleted_files, 2);
        assert!(!storage.audio_exists(&oldest).await);
        assert!(!storage.audio_exists(&middle).await);
        assert!(storage.audio_exists(&newest).await);

        // 已经在限额内
        assert_eq!(storage.evict_to_size(150).await.unwrap(), GcResult::default());
    }

    #[tokio::test]
    async fn test_gc_applies_size_limit_after_age() {
        let temp_dir = tempdir().unwrap();
        let storage = FileAudioStorage::new(temp_dir.path()).await.unwrap();

        write_audio(&storage, 100, Duration::from_secs(7200)).await;
        let older = write_audio(&storage, 100, Duration::from_secs(60)).await;
        let newer = write_audio(&storage, 100, Duration::from_secs(10)).await;

        let policy = RetentionPolicy {
            max_age: Duration::from_secs(3600),
            max_storage_bytes: 100,
        };
        let result = storage.gc(&policy).await.unwrap();

        assert_eq!(result.deleted_files, 2);
        assert_eq!(result.freed_bytes, 200);
        assert!(!storage.audio_exists(&older).await);
        assert!(storage.audio_exists(&newer).await);
    }
}
