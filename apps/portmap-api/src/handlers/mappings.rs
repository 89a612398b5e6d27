//! 映射 handlers
//!
//! - GET /mappings - 列出映射
//! - DELETE /mappings/{id} - 删除映射
//! - PUT /mappings/{id}/target-server - 改写目标服务器（名称或完整服务器）
//! - GET /mappings/export - 导出映射（JSON 数组）
//! - POST /mappings/import - 导入映射（整体替换；解析失败不修改）

use crate::AppState;
use crate::utils::normalize_required;
use crate::utils::response::{bad_request_error, internal_error, not_found_error, ok};
use api_contract::{ImportDto, UpdateMappingTargetRequest};
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

pub async fn list_mappings(State(state): State<AppState>) -> Response {
    ok(StatusCode::OK, state.store.mappings().get())
}

pub async fn delete_mapping(
    State(state): State<AppState>,
    Path(mapping_id): Path<String>,
) -> Response {
    if state.store.remove_mapping(&mapping_id) {
        ok(StatusCode::OK, ())
    } else {
        not_found_error()
    }
}

/// 改写映射目标服务器
///
/// 映射不存在，或改写后与已有映射重复时返回 404 / 400，映射保持不变。
pub async fn update_mapping_target_server(
    State(state): State<AppState>,
    Path(mapping_id): Path<String>,
    Json(req): Json<UpdateMappingTargetRequest>,
) -> Response {
    let target_server = match normalize_required(req.target_server.into_name(), "targetServer") {
        Ok(name) => name,
        Err(response) => return response,
    };
    let exists = state
        .store
        .mappings()
        .get()
        .iter()
        .any(|mapping| mapping.id == mapping_id);
    if !exists {
        return not_found_error();
    }
    if !state
        .store
        .update_mapping_target_server(&mapping_id, target_server)
    {
        return bad_request_error("mapping already exists for target server");
    }
    ok(StatusCode::OK, state.store.mappings().get())
}

pub async fn export_mappings(State(state): State<AppState>) -> Response {
    match state.store.export_mappings() {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => internal_error(err.to_string()),
    }
}

pub async fn import_mappings(State(state): State<AppState>, body: String) -> Response {
    let payload = match normalize_required(body, "payload") {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    match state.store.try_import_mappings(&payload) {
        Ok(report) => ok(
            StatusCode::OK,
            ImportDto {
                imported: report.imported,
                total: report.total,
            },
        ),
        Err(err) => bad_request_error(err.to_string()),
    }
}
