//! Turn Commands - 轮次命令

use tokio_util::sync::CancellationToken;

use crate::domain::{RawAudioUpload, TurnReply};

/// 语音轮次：上传音频 → 导师回复
#[derive(Debug, Clone)]
pub struct VoiceTurnCommand {
    pub upload: RawAudioUpload,
    /// 请求取消信号（客户端断开）
    pub cancel: CancellationToken,
}

/// 文本轮次：跳过转码和转写
#[derive(Debug, Clone)]
pub struct TextTurnCommand {
    pub message: String,
    pub cancel: CancellationToken,
}

/// 直接合成任意文本
#[derive(Debug, Clone)]
pub struct SpeakTextCommand {
    pub text: String,
}

/// 轮次结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// 正常回复
    Replied(TurnReply),
    /// 提示性终止（没听清 / 模型无输出），不是错误
    Advisory(&'static str),
}
