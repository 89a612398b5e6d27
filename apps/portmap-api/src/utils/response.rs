//! HTTP 响应辅助函数
//!
//! 提供统一的响应构造函数：
//! - 成功响应：ok
//! - 错误响应：bad_request_error, not_found_error, server_draft_error, assign_error, lookup_error, internal_error
//!
//! 设计原则：
//! - 所有响应返回统一的 ApiResponse 格式
//! - HTTP 状态码与错误码对应

use api_contract::ApiResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::ServerDraftError;
use portmap_cascade::{AssignError, CascadeError};
use serde::Serialize;

/// 成功响应
pub fn ok<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(ApiResponse::success(data))).into_response()
}

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 资源未找到错误响应
pub fn not_found_error() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("RESOURCE.NOT_FOUND", "not found")),
    )
        .into_response()
}

/// 服务器表单校验失败响应
pub fn server_draft_error(err: ServerDraftError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("SERVER.INVALID", err.to_string())),
    )
        .into_response()
}

/// 分配前置条件不满足响应
pub fn assign_error(err: AssignError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(
            "ASSIGN.MISSING_SELECTION",
            err.to_string(),
        )),
    )
        .into_response()
}

/// 外部查询失败响应
pub fn lookup_error(err: CascadeError) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(ApiResponse::<()>::error("LOOKUP.FAILED", err.to_string())),
    )
        .into_response()
}

/// 内部错误响应
pub fn internal_error(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", message.into())),
    )
        .into_response()
}
