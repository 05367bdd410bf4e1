//! Temp File Port - 请求级临时文件生命周期
//!
//! 每个临时文件在做任何可能失败的操作之前就被登记为 [`TempFile`]，
//! 离开作用域时一定会被删除（成功、引擎失败、超时、取消都一样）。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 临时文件错误
#[derive(Debug, Error)]
pub enum TempFileError {
    #[error("Failed to prepare temp root {path}: {reason}")]
    RootUnavailable { path: String, reason: String },

    #[error("IO error: {0}")]
    IoError(String),
}

/// 临时文件用途
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempKind {
    /// 原始上传
    Upload,
    /// 规范 WAV
    Canonical,
}

impl TempKind {
    pub fn prefix(self) -> &'static str {
        match self {
            TempKind::Upload => "input",
            TempKind::Canonical => "canonical",
        }
    }
}

/// 作用域临时文件
///
/// Drop 时删除文件；删除失败只记日志，不会掩盖原始错误
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    released: bool,
}

impl TempFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 提前释放
    pub fn release(mut self) {
        release_path(&self.path);
        self.released = true;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.released {
            release_path(&self.path);
        }
    }
}

/// 删除文件（如果存在），吞掉并记录失败
///
/// 同步删除：Drop 里无法 await，且轮次结束时文件必须已经不在临时目录里。
/// 临时文件只有上传音频和规范 WAV，单次 unlink 的阻塞可以忽略。
pub fn release_path(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Temp file released");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to delete temp file"
            );
        }
    }
}

/// Temp File Port
#[async_trait]
pub trait TempFilePort: Send + Sync {
    /// 分配一个不冲突的路径（根目录不存在时自动创建）
    ///
    /// 文件本身不会被创建，只返回登记好的守卫
    async fn acquire(&self, kind: TempKind, extension: &str) -> Result<TempFile, TempFileError>;

    /// 临时文件根目录
    fn root(&self) -> &Path;
}
