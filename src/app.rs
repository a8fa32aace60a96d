//! HTTP 应用组装
//!
//! 所有路径共享同一组方法处理器：OPTIONS 预检、GET 状态、POST 认证后转发，
//! 其余方法返回 405

use crate::config::{Config, SharedSource};
use crate::{auth, cors, handlers};
use axum::{
    extract::DefaultBodyLimit, handler::Handler, middleware, routing::get, Extension, Router,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Only the connect phase is bounded unless an overall timeout is configured,
/// so long-running streamed responses are not cut off.
pub fn upstream_client(config: &Config) -> reqwest::Result<Client> {
    let mut builder = Client::builder().connect_timeout(Duration::from_secs(10));
    if let Some(secs) = config.upstream_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build()
}

/// `0` disables the limit entirely.
fn body_limit(max_body_bytes: usize) -> DefaultBodyLimit {
    if max_body_bytes == 0 {
        DefaultBodyLimit::disable()
    } else {
        DefaultBodyLimit::max(max_body_bytes)
    }
}

pub fn build_router(config: Arc<Config>, client: Client, source: SharedSource) -> Router {
    let routes = get(handlers::status_handler)
        .post(handlers::forward_handler.layer(middleware::from_fn(auth::require_auth)))
        .options(handlers::preflight_handler)
        // axum 默认把 HEAD 交给 GET 处理
        .head(handlers::method_not_allowed)
        .fallback(handlers::method_not_allowed);

    Router::new()
        .route("/", routes.clone())
        .route("/*path", routes)
        .layer(middleware::map_response(cors::allow_any_origin))
        .layer(body_limit(config.max_body_bytes))
        .layer(Extension(config))
        .layer(Extension(client))
        .layer(Extension(source))
        .layer(TraceLayer::new_for_http())
}
