//! 调用方认证
//!
//! 从 Authorization 头提取 Bearer 密钥，并与 AUTH_KEYS 白名单比对

use crate::config::{ConfigSource, SharedSource, AUTH_KEYS};
use crate::error::ProxyError;
use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};
use serde_json::Value;

/// 提取 Bearer 密钥：去掉 `Bearer ` 前缀和首尾空白
pub fn bearer_token(headers: &HeaderMap) -> &str {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    value.strip_prefix("Bearer ").unwrap_or(value).trim()
}

/// Membership check against the `AUTH_KEYS` JSON array. Fails closed on an
/// empty token and on missing or malformed configuration.
pub fn is_authorized(token: &str, source: &dyn ConfigSource) -> bool {
    if token.is_empty() {
        return false;
    }

    let Some(raw) = source.get(AUTH_KEYS) else {
        tracing::error!("{} is not set, rejecting all requests", AUTH_KEYS);
        return false;
    };

    let keys: Vec<Value> = match serde_json::from_str(&raw) {
        Ok(keys) => keys,
        Err(e) => {
            tracing::error!("Failed to parse {} as a JSON array: {}", AUTH_KEYS, e);
            return false;
        }
    };

    keys.iter().any(|k| k.as_str() == Some(token))
}

/// 认证中间件，只挂在 POST 处理器前
pub async fn require_auth(
    Extension(source): Extension<SharedSource>,
    request: Request,
    next: Next,
) -> Result<Response, ProxyError> {
    if !is_authorized(bearer_token(request.headers()), source.as_ref()) {
        return Err(ProxyError::Unauthorized);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticSource;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn source() -> StaticSource {
        StaticSource::new(&[(AUTH_KEYS, r#"["sk-router-1", "sk-router-2"]"#)])
    }

    #[test]
    fn test_bearer_token_strips_prefix() {
        assert_eq!(bearer_token(&headers_with_auth("Bearer sk-abc")), "sk-abc");
        assert_eq!(bearer_token(&headers_with_auth("Bearer   sk-abc  ")), "sk-abc");
    }

    #[test]
    fn test_bearer_token_without_prefix() {
        assert_eq!(bearer_token(&headers_with_auth("sk-abc")), "sk-abc");
    }

    #[test]
    fn test_bearer_token_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), "");
    }

    #[test]
    fn test_known_key_is_authorized() {
        assert!(is_authorized("sk-router-1", &source()));
        assert!(is_authorized("sk-router-2", &source()));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(!is_authorized("sk-other", &source()));
        assert!(!is_authorized("SK-ROUTER-1", &source()));
        assert!(!is_authorized("sk-router", &source()));
    }

    #[test]
    fn test_empty_token_is_rejected() {
        assert!(!is_authorized("", &source()));
    }

    #[test]
    fn test_missing_config_fails_closed() {
        assert!(!is_authorized("sk-router-1", &StaticSource::default()));
    }

    #[test]
    fn test_malformed_config_fails_closed() {
        let source = StaticSource::new(&[(AUTH_KEYS, "sk-router-1")]);
        assert!(!is_authorized("sk-router-1", &source));

        let source = StaticSource::new(&[(AUTH_KEYS, r#"{"key": "sk-router-1"}"#)]);
        assert!(!is_authorized("sk-router-1", &source));
    }

    #[test]
    fn test_non_string_entries_never_match() {
        let source = StaticSource::new(&[(AUTH_KEYS, r#"[123, null, "sk-ok"]"#)]);
        assert!(!is_authorized("123", &source));
        assert!(is_authorized("sk-ok", &source));
    }
}
