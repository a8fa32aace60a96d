//! 转发端点处理器（POST 任意路径）

use crate::config::{Config, ConfigSource, SharedSource};
use crate::error::ProxyResult;
use crate::{forwarder, resolver};
use axum::{
    http::{HeaderMap, Uri},
    response::Response,
    Extension,
};
use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;

/// Authentication has already run as middleware; this parses the body,
/// resolves the upstream and forwards.
pub async fn forward_handler(
    Extension(config): Extension<Arc<Config>>,
    Extension(client): Extension<Client>,
    Extension(source): Extension<SharedSource>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle(&config, &client, source.as_ref(), uri.path(), &headers, &body).await {
        Ok(response) => response,
        Err(e) => e.into_response_with_details(config.expose_error_details),
    }
}

async fn handle(
    config: &Config,
    client: &Client,
    source: &dyn ConfigSource,
    path: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> ProxyResult<Response> {
    let raw_json: Value = serde_json::from_slice(body).map_err(|e| {
        tracing::error!("Failed to parse request as JSON: {}", e);
        e
    })?;

    if config.debug && config.log_raw_json {
        tracing::debug!(
            "Raw request JSON: {}",
            serde_json::to_string_pretty(&raw_json).unwrap_or_default()
        );
    }

    // 保留原始大小写
    let model = raw_json
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or("");

    let resolution = resolver::resolve(model, source)?;

    forwarder::forward(client, headers, path, &raw_json, &resolution).await
}
