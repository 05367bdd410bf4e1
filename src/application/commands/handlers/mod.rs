//! Command Handlers 实现

mod speech_handlers;
mod turn_handlers;

pub use speech_handlers::*;
pub use turn_handlers::*;
