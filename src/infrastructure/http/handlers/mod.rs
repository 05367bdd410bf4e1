//! HTTP Handlers

mod ping;
mod speech;
mod turn;

pub use ping::*;
pub use speech::*;
pub use turn::*;
