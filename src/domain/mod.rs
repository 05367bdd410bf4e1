//! Domain Layer - 领域层
//!
//! 一个 Turn（对话轮次）上下文，以及三个纯函数组件：
//! - PromptBuilder: 构建导师提示词
//! - TutorResponseParser: 解析模型的分段输出
//! - TextSanitizer: 合成前的文本清洗

pub mod turn;

mod prompt_builder;
mod response_parser;
mod text_sanitizer;

pub use prompt_builder::{build_tutor_prompt, TUTOR_PROMPT_TEMPLATE};
pub use response_parser::{parse_tutor_response, SectionLayout, SectionRole};
pub use text_sanitizer::sanitize_for_speech;
pub use turn::{
    ParsedTutorResponse, RawAudioUpload, TranscriptText, TurnId, TurnPath, TurnReply, TurnState,
    TurnTrace,
};
