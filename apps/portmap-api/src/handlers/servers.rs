//! 服务器与会话状态 handlers
//!
//! - GET /health - 健康检查
//! - GET /state - 全部状态切片
//! - DELETE /state - 重置状态与级联流程并删除会话记录
//! - GET /servers - 列出服务器（含映射端口数）
//! - POST /servers - 新建服务器（成为当前源服务器，级联流程重新开始）
//! - PUT /servers/{id} - 修改名称与位置（改名同步到映射）
//! - DELETE /servers/{id} - 删除服务器及引用它的映射

use crate::AppState;
use crate::utils::response::{internal_error, not_found_error, ok, server_draft_error};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::ServerDraft;
use portmap_state::StateError;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn get_state(State(state): State<AppState>) -> Response {
    ok(StatusCode::OK, state.store.current_state())
}

pub async fn clear_state(State(state): State<AppState>) -> Response {
    state.cascade.clear_state();
    ok(StatusCode::OK, ())
}

pub async fn list_servers(State(state): State<AppState>) -> Response {
    ok(StatusCode::OK, state.store.servers().get())
}

/// 新建服务器
///
/// 表单先校验（名称必填且不少于 3 个字符，位置必填），新服务器 id 为现有最大 id + 1，
/// 并被设为当前源服务器。
pub async fn create_server(
    State(state): State<AppState>,
    Json(req): Json<ServerDraft>,
) -> Response {
    let draft = ServerDraft::new(req.name, req.location);
    save(&state, &draft, StatusCode::CREATED).await
}

pub async fn update_server(
    State(state): State<AppState>,
    Path(server_id): Path<i64>,
    Json(req): Json<ServerDraft>,
) -> Response {
    let draft = ServerDraft::editing(server_id, req.name, req.location);
    save(&state, &draft, StatusCode::OK).await
}

pub async fn delete_server(State(state): State<AppState>, Path(server_id): Path<i64>) -> Response {
    if state.cascade.remove_server(server_id).await {
        ok(StatusCode::OK, ())
    } else {
        not_found_error()
    }
}

async fn save(state: &AppState, draft: &ServerDraft, status: StatusCode) -> Response {
    match state.cascade.save_server(draft).await {
        Ok(server) => ok(status, server),
        Err(StateError::InvalidServer(err)) => server_draft_error(err),
        Err(StateError::UnknownServer(_)) => not_found_error(),
        Err(err) => internal_error(err.to_string()),
    }
}
