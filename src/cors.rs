//! CORS 响应头
//!
//! 所有响应都允许任意来源；预检请求和转发响应额外带上方法和头部白名单

use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::Response,
};

pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const MAX_AGE_SECS: &str = "86400";

/// Headers for an `OPTIONS` preflight response.
pub fn preflight_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    overlay_forwarded(&mut headers);
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(MAX_AGE_SECS),
    );
    headers
}

/// Overwrites the CORS headers on a relayed upstream response.
pub fn overlay_forwarded(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
}

/// `map_response` middleware: every response leaves with `Access-Control-Allow-Origin: *`.
pub async fn allow_any_origin(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}
