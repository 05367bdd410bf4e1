//! Turn Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 轮次唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 上传的原始音频
///
/// 由创建它的请求独占，只存活一个轮次
#[derive(Debug, Clone)]
pub struct RawAudioUpload {
    pub bytes: Vec<u8>,
    /// 声明的 Content-Type（浏览器录音通常是 audio/webm）
    pub content_type: Option<String>,
    /// 原始文件名
    pub file_name: Option<String>,
}

impl RawAudioUpload {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 临时文件扩展名
    ///
    /// 优先 Content-Type，其次文件名，默认 webm
    pub fn extension(&self) -> &str {
        let from_type = self.content_type.as_deref().and_then(|ct| {
            let essence = ct.split(';').next().unwrap_or(ct).trim();
            match essence.to_ascii_lowercase().as_str() {
                "audio/webm" | "video/webm" => Some("webm"),
                "audio/ogg" | "audio/opus" => Some("ogg"),
                "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
                "audio/mpeg" | "audio/mp3" => Some("mp3"),
                "audio/mp4" | "audio/x-m4a" | "audio/aac" => Some("m4a"),
                "audio/flac" | "audio/x-flac" => Some("flac"),
                _ => None,
            }
        });
        if let Some(ext) = from_type {
            return ext;
        }

        self.file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext))
            .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("webm")
    }
}

/// 转写文本
///
/// 可能为空：空文本是合法的终止状态（没听清），不是错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptText(String);

impl TranscriptText {
    /// 从 STT 原始输出构建，去除首尾空白
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl std::fmt::Display for TranscriptText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 解析后的导师回复
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTutorResponse {
    /// 模型完整输出（返回给调用方）
    pub full_text: String,
    /// 交给语音合成的部分
    pub speakable_text: String,
}

/// 一个轮次的最终回复
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReply {
    pub response: String,
    pub audio_url: Option<String>,
}
