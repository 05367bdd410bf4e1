//! Turn Context - 状态机
//!
//! Received → Transcoded → Transcribed → (EmptyTranscript | Generated) → Parsed
//! → Synthesized(可选) → Completed
//!
//! 任意状态都可以直接进入 Completed（错误、超时、提前退出）。
//! 文本轮次（/chat）跳过 Transcoded，从 Received 直接进入 Transcribed。

use std::time::{Duration, Instant};

use super::TurnId;

/// 轮次状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Received,
    Transcoded,
    Transcribed,
    EmptyTranscript,
    Generated,
    Parsed,
    Synthesized,
    Completed,
}

impl TurnState {
    /// 状态转换是否合法
    pub fn can_transition_to(self, next: TurnState) -> bool {
        use TurnState::*;

        if next == Completed {
            return self != Completed;
        }

        matches!(
            (self, next),
            (Received, Transcoded)
                | (Received, Transcribed)
                | (Transcoded, Transcribed)
                | (Transcribed, EmptyTranscript)
                | (Transcribed, Generated)
                | (Generated, EmptyTranscript)
                | (Generated, Parsed)
                | (Parsed, Synthesized)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == TurnState::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TurnState::Received => "received",
            TurnState::Transcoded => "transcoded",
            TurnState::Transcribed => "transcribed",
            TurnState::EmptyTranscript => "empty_transcript",
            TurnState::Generated => "generated",
            TurnState::Parsed => "parsed",
            TurnState::Synthesized => "synthesized",
            TurnState::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 轮次的终止路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPath {
    /// 正常回复（可能没有音频）
    Replied,
    /// 提示性终止（没听清 / 模型无输出）
    Advisory,
    /// 阶段失败
    Failed,
}

/// 轮次轨迹
///
/// 记录状态转换历史，非法转换只记录日志，不 panic
#[derive(Debug)]
pub struct TurnTrace {
    turn_id: TurnId,
    state: TurnState,
    history: Vec<TurnState>,
    started_at: Instant,
}

impl TurnTrace {
    pub fn new(turn_id: TurnId) -> Self {
        Self {
            turn_id,
            state: TurnState::Received,
            history: vec![TurnState::Received],
            started_at: Instant::now(),
        }
    }

    pub fn turn_id(&self) -> TurnId {
        self.turn_id
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn history(&self) -> &[TurnState] {
        &self.history
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// 推进到下一个状态
    ///
    /// 返回转换是否被接受
    pub fn advance(&mut self, next: TurnState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::error!(
                turn_id = %self.turn_id,
                from = %self.state,
                to = %next,
                "Illegal turn state transition ignored"
            );
            return false;
        }

        tracing::debug!(
            turn_id = %self.turn_id,
            from = %self.state,
            to = %next,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Turn state changed"
        );

        self.state = next;
        self.history.push(next);
        true
    }

    /// 进入 Completed
    pub fn complete(&mut self, path: TurnPath) {
        if self.state.is_terminal() {
            return;
        }
        let last = self.state;
        self.advance(TurnState::Completed);

        tracing::info!(
            turn_id = %self.turn_id,
            path = ?path,
            last_stage = %last,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Turn completed"
        );
    }
}
