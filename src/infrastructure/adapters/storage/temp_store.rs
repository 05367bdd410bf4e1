//! Local Temp Store - 请求级临时文件
//!
//! 文件名为 `<kind>_<uuid>.<ext>`，并发请求之间不会冲突。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::application::ports::{TempFile, TempFileError, TempFilePort, TempKind};

/// 本地临时目录
pub struct LocalTempStore {
    root: PathBuf,
}

impl LocalTempStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

/// 扩展名只保留字母数字，空则用 bin
fn safe_extension(extension: &str) -> String {
    let ext: String = extension
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() {
        "bin".to_string()
    } else {
        ext
    }
}

#[async_trait]
impl TempFilePort for LocalTempStore {
    async fn acquire(&self, kind: TempKind, extension: &str) -> Result<TempFile, TempFileError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| TempFileError::RootUnavailable {
                path: self.root.display().to_string(),
                reason: e.to_string(),
            })?;

        let file_name = format!(
            "{}_{}.{}",
            kind.prefix(),
            Uuid::new_v4(),
            safe_extension(extension)
        );
        Ok(TempFile::new(self.root.join(file_name)))
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
