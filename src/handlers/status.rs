//! 非转发请求：CORS 预检、状态检查、不支持的方法

use crate::cors;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
    pub message: &'static str,
}

/// OPTIONS: 204 with the full preflight header set.
pub async fn preflight_handler() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, cors::preflight_headers())
}

/// GET: 服务状态
pub async fn status_handler() -> Json<StatusBody> {
    Json(StatusBody {
        status: "ok",
        message: "OpenAI API Router is running",
    })
}

pub async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}
