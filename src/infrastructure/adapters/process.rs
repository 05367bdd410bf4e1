//! Bounded Process Runner - 外部进程调用
//!
//! 所有外部引擎（ffmpeg、whisper-cli、piper）都通过这里执行：
//! - 硬性墙钟超时
//! - 请求取消信号
//! - 超时/取消/Future 被丢弃时子进程一定被 kill（kill_on_drop）

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// stderr 在日志里最多保留的字符数
const STDERR_LOG_LIMIT: usize = 2000;

/// 进程错误
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program} exited with code {code:?}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} timed out after {limit:?}")]
    TimedOut { program: String, limit: Duration },

    #[error("{program} cancelled")]
    Cancelled { program: String },

    #[error("IO error while running {program}: {reason}")]
    Io { program: String, reason: String },
}

impl ProcessError {
    /// 供日志使用的详细信息（含截断后的 stderr）
    pub fn detail(&self) -> String {
        match self {
            ProcessError::Failed { stderr, .. } => truncate(stderr, STDERR_LOG_LIMIT),
            other => other.to_string(),
        }
    }
}

/// 进程输出
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// 一次外部进程调用
#[derive(Debug, Clone)]
pub struct BoundedProcess {
    program: PathBuf,
    args: Vec<String>,
    stdin: Option<Vec<u8>>,
    limit: Duration,
}

impl BoundedProcess {
    pub fn new(program: impl AsRef<Path>, limit: Duration) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            stdin: None,
            limit,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<std::ffi::OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// 写入 stdin 的内容（写完即关闭）
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// 执行并等待退出，要求退出码为 0
    pub async fn run(self, cancel: &CancellationToken) -> Result<ProcessOutput, ProcessError> {
        let program = self.program_name();

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            program = %program,
            args = ?self.args,
            limit_ms = self.limit.as_millis() as u64,
            "Spawning external process"
        );

        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| ProcessError::Spawn {
            program: program.clone(),
            reason: e.to_string(),
        })?;

        let stdin_pipe = child.stdin.take();
        let input = self.stdin;
        let run = async move {
            if let (Some(mut pipe), Some(input)) = (stdin_pipe, input) {
                pipe.write_all(&input).await?;
                pipe.shutdown().await?;
            }
            // child 被移入这个 Future：Future 被丢弃时 kill_on_drop 生效
            child.wait_with_output().await
        };

        let output = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::warn!(program = %program, "External process cancelled, killing");
                return Err(ProcessError::Cancelled { program });
            }
            result = tokio::time::timeout(self.limit, run) => match result {
                Err(_) => {
                    tracing::warn!(
                        program = %program,
                        limit_ms = self.limit.as_millis() as u64,
                        "External process timed out, killing"
                    );
                    return Err(ProcessError::TimedOut { program, limit: self.limit });
                }
                Ok(Err(e)) => {
                    return Err(ProcessError::Io { program, reason: e.to_string() });
                }
                Ok(Ok(output)) => output,
            }
        };

        let elapsed = started.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ProcessError::Failed {
                program,
                code: output.status.code(),
                stderr,
            });
        }

        tracing::debug!(
            program = %program,
            elapsed_ms = elapsed.as_millis() as u64,
            stdout_len = stdout.len(),
            "External process finished"
        );

        Ok(ProcessOutput {
            stdout,
            stderr,
            elapsed,
        })
    }
}

fn truncate(text: &str, limit: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= limit {
        return text.to_string();
    }
    // 保留尾部：错误信息通常在最后
    let skip = text.chars().count() - limit;
    format!("...{}", text.chars().skip(skip).collect::<String>())
}

#[cfg(all(test, unix))]
pub(crate) mod test_scripts {
    //! 测试用的可执行 shell 脚本

    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// 在 dir 下写一个可执行脚本
    pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }
}
