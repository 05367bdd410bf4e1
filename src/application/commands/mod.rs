//! 应用层 - 命令
//!
//! 轮次命令及其处理器

mod turn_commands;

pub mod handlers;

pub use turn_commands::*;
