//! HTTP Layer - 对话接口
//!
//! 所有业务错误都以 HTTP 200 + `{"error": "<提示语>"}` 返回，
//! 前端只看响应体，不看状态码。

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_routes;
pub use server::{HttpServer, ServerConfig};
pub use state::AppState;
