//! HTTP Middleware
//!
//! 请求耗时与非 200 状态日志

use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// 处理耗时响应头（毫秒）
pub const RESPONSE_TIME_HEADER: HeaderName = HeaderName::from_static("x-response-time-ms");

/// 超过该耗时的请求记一条 warn
const SLOW_REQUEST: Duration = Duration::from_secs(30);

/// 请求日志中间件
///
/// 业务错误都以 200 返回，由 ApiError::into_response() 记录；
/// 这里只负责 4xx/5xx（上传超限、音频不存在等）和慢请求。
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed = started.elapsed();
    let elapsed_ms = elapsed.as_millis() as u64;

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms,
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms,
            "HTTP client error"
        );
    } else if elapsed >= SLOW_REQUEST {
        tracing::warn!(method = %method, uri = %uri, elapsed_ms, "Slow request");
    }

    if let Ok(value) = HeaderValue::from_str(&elapsed_ms.to_string()) {
        response.headers_mut().insert(RESPONSE_TIME_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::util::ServiceExt;

    fn router() -> Router {
        Router::new()
            .route("/api/ping", get(|| async { "ok" }))
            .route(
                "/audio/missing.wav",
                get(|| async { StatusCode::NOT_FOUND }),
            )
            .route(
                "/voice-chat",
                get(|| async { StatusCode::PAYLOAD_TOO_LARGE }),
            )
            .layer(axum::middleware::from_fn(request_logging_middleware))
    }

    async fn get_status(uri: &str) -> (StatusCode, bool) {
        let request = HttpRequest::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        let timed = response
            .headers()
            .get(RESPONSE_TIME_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .is_some();
        (response.status(), timed)
    }

    #[tokio::test]
    async fn test_success_carries_response_time() {
        assert_eq!(get_status("/api/ping").await, (StatusCode::OK, true));
    }

    #[tokio::test]
    async fn test_error_statuses_pass_through() {
        assert_eq!(
            get_status("/audio/missing.wav").await,
            (StatusCode::NOT_FOUND, true)
        );
        assert_eq!(
            get_status("/voice-chat").await,
            (StatusCode::PAYLOAD_TOO_LARGE, true)
        );
    }
}
