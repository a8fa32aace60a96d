//! 请求转发
//!
//! 重写请求头、目标地址和请求体，发送到上游并透传响应

use crate::cors;
use crate::error::{ProxyError, ProxyResult};
use crate::resolver::Resolution;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::Response,
};
use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;

/// 上游地址包含该标记时按 Cloudflare AI 网关规则拼接路径
const CLOUDFLARE_MARKER: &str = "cloudflare.com";

/// 不从入站请求复制的头部
const SKIPPED_REQUEST_HEADERS: &[&str] = &["host", "content-length", "authorization"];

/// Connection-level headers. They describe one hop and are never relayed
/// in either direction.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// Removes one leading `/v1` segment. `/v1beta/...` is left alone.
fn strip_v1_segment(path: &str) -> &str {
    match path.strip_prefix("/v1") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

/// 构建上游 URL
pub fn upstream_url(endpoint: &str, path: &str) -> String {
    if endpoint.contains(CLOUDFLARE_MARKER) {
        // Cloudflare 网关地址本身已包含版本前缀
        format!("{}{}", endpoint, strip_v1_segment(path))
    } else {
        let endpoint = endpoint.strip_suffix('/').unwrap_or(endpoint);
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/{}", endpoint, path)
    }
}

/// Outbound headers: JSON content type and the upstream credential, then
/// every inbound header except `host`, `content-length`, `authorization` and
/// hop-by-hop headers. Inbound values replace the defaults.
pub fn outbound_headers(inbound: &HeaderMap, credential: &str) -> ProxyResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    let mut auth = HeaderValue::from_str(&format!("Bearer {}", credential)).map_err(|_| {
        ProxyError::Internal("Upstream credential is not a valid header value".into())
    })?;
    auth.set_sensitive(true);
    headers.insert(header::AUTHORIZATION, auth);

    for name in inbound.keys() {
        if SKIPPED_REQUEST_HEADERS.contains(&name.as_str()) || is_hop_by_hop(name) {
            continue;
        }

        headers.remove(name);
        for value in inbound.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    Ok(headers)
}

/// 发送到上游并透传响应（状态码、头部、流式 body），最后覆盖 CORS 头
pub async fn forward(
    client: &Client,
    inbound_headers: &HeaderMap,
    path: &str,
    body: &Value,
    resolution: &Resolution,
) -> ProxyResult<Response> {
    let url = upstream_url(&resolution.endpoint, path);

    if resolution.endpoint.contains(CLOUDFLARE_MARKER) {
        tracing::info!("Forwarding to Cloudflare API: {}", url);
    } else {
        tracing::info!("Forwarding to: {}", url);
    }

    let headers = outbound_headers(inbound_headers, &resolution.credential)?;

    let upstream = client
        .post(&url)
        .headers(headers)
        .body(serde_json::to_vec(body)?)
        .send()
        .await?;

    let status = upstream.status();
    if !status.is_success() {
        tracing::warn!("Upstream {} returned {}", url, status);
    } else {
        tracing::debug!("Upstream {} returned {}", url, status);
    }

    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        if !is_hop_by_hop(name) {
            response_headers.append(name.clone(), value.clone());
        }
    }
    cors::overlay_forwarded(&mut response_headers);

    // 直接透传流（同时覆盖 SSE 流式响应）
    let passthrough_stream = upstream.bytes_stream().map(move |result| {
        result.map_err(|e| {
            tracing::error!("Upstream body from {} failed mid-stream: {}", url, e);
            std::io::Error::other(e)
        })
    });

    let mut response = Response::new(Body::from_stream(passthrough_stream));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloudflare_url_strips_v1() {
        assert_eq!(
            upstream_url("https://gateway.cloudflare.com/ai", "/v1/chat/completions"),
            "https://gateway.cloudflare.com/ai/chat/completions"
        );
    }

    #[test]
    fn test_cloudflare_url_strips_only_one_segment() {
        assert_eq!(
            upstream_url("https://gateway.cloudflare.com/ai", "/v1/v1/models"),
            "https://gateway.cloudflare.com/ai/v1/models"
        );
    }

    #[test]
    fn test_cloudflare_url_without_v1() {
        assert_eq!(
            upstream_url("https://gateway.cloudflare.com/ai", "/chat/completions"),
            "https://gateway.cloudflare.com/ai/chat/completions"
        );
        assert_eq!(
            upstream_url("https://gateway.cloudflare.com/ai", "/v1beta/models"),
            "https://gateway.cloudflare.com/ai/v1beta/models"
        );
    }

    #[test]
    fn test_cloudflare_url_bare_v1() {
        assert_eq!(
            upstream_url("https://gateway.cloudflare.com/ai", "/v1"),
            "https://gateway.cloudflare.com/ai"
        );
    }

    #[test]
    fn test_general_url_keeps_path() {
        assert_eq!(
            upstream_url("https://api.example.com/", "/v1/chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            upstream_url("https://api.example.com", "/v1/chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_general_url_trims_single_slash_only() {
        assert_eq!(
            upstream_url("https://api.example.com/openai//", "/v1/models"),
            "https://api.example.com/openai//v1/models"
        );
    }

    #[test]
    fn test_outbound_headers_replace_authorization() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer sk-router"));
        inbound.insert(header::HOST, HeaderValue::from_static("router.example"));
        inbound.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        inbound.insert("x-request-id", HeaderValue::from_static("abc"));

        let headers = outbound_headers(&inbound, "sk-upstream").unwrap();

        assert_eq!(headers[header::AUTHORIZATION], "Bearer sk-upstream");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers["x-request-id"], "abc");
        assert!(headers.get(header::HOST).is_none());
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
    }

    #[test]
    fn test_outbound_headers_inbound_content_type_wins() {
        let mut inbound = HeaderMap::new();
        inbound.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );

        let headers = outbound_headers(&inbound, "sk-upstream").unwrap();
        assert_eq!(headers.get_all(header::CONTENT_TYPE).iter().count(), 1);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json; charset=utf-8");
    }

    #[test]
    fn test_outbound_headers_skip_hop_by_hop() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        inbound.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        inbound.insert(header::ACCEPT, HeaderValue::from_static("text/event-stream"));

        let headers = outbound_headers(&inbound, "sk-upstream").unwrap();
        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(headers[header::ACCEPT], "text/event-stream");
    }

    #[test]
    fn test_outbound_headers_keep_repeated_values() {
        let mut inbound = HeaderMap::new();
        inbound.append("x-tag", HeaderValue::from_static("a"));
        inbound.append("x-tag", HeaderValue::from_static("b"));

        let headers = outbound_headers(&inbound, "sk-upstream").unwrap();
        let values: Vec<_> = headers.get_all("x-tag").iter().collect();
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn test_outbound_headers_reject_invalid_credential() {
        let err = outbound_headers(&HeaderMap::new(), "bad\nkey").unwrap_err();
        assert!(matches!(err, ProxyError::Internal(_)));
        assert!(!err.to_string().contains("bad\nkey"));
    }
}
