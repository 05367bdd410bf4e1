//! Turn Context - 一次完整的 "上传音频 → 导师回复" 周期

mod state;
mod value_objects;

pub use state::{TurnPath, TurnState, TurnTrace};
pub use value_objects::{ParsedTutorResponse, RawAudioUpload, TranscriptText, TurnId, TurnReply};
