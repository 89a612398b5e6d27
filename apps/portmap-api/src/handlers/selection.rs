//! 级联选择 handlers
//!
//! - GET /selection - 当前阶段、查询结果与所选项
//! - PUT /selection/source-server - 切换源服务器（重新开始级联并加载产品）
//! - PUT /selection/target-server - 选择目标服务器
//! - POST /selection/products/reload - 重新加载产品
//! - PUT /selection/product - 选择产品并查询源服务
//! - PUT /selection/source - 选择源服务并查询候选端口（单个或列表）
//! - PUT /selection/targets - 选择目标（单个或列表）
//! - POST /selection/assign - 把所选目标分配为映射
//!
//! 查询失败返回 502，已加载的数据保持不变。

use crate::AppState;
use crate::utils::response::{assign_error, lookup_error, not_found_error, ok};
use api_contract::{
    AssignmentDto, LookupDto, SelectProductRequest, SelectServerRequest, SelectSourceRequest,
    SelectTargetsRequest, SelectionDto,
};
use axum::{Json, extract::State, http::StatusCode, response::Response};
use domain::Server;
use portmap_cascade::{CascadeError, LookupOutcome};

pub async fn get_selection(State(state): State<AppState>) -> Response {
    let cascade = &state.cascade;
    let dto = SelectionDto {
        stage: cascade.stage().get().as_str().to_string(),
        products: cascade.products().get(),
        sources: cascade.sources().get(),
        targets: cascade.targets().get(),
        selected_product: state.store.selected_product().get(),
        selected_source: state.store.selected_source().get(),
        selected_targets: state.store.selected_targets().get(),
    };
    ok(StatusCode::OK, dto)
}

pub async fn select_source_server(
    State(state): State<AppState>,
    Json(req): Json<SelectServerRequest>,
) -> Response {
    let server = match resolve_server(&state, req.server_id) {
        Ok(server) => server,
        Err(response) => return response,
    };
    lookup_response(state.cascade.set_source_server(server).await)
}

pub async fn select_target_server(
    State(state): State<AppState>,
    Json(req): Json<SelectServerRequest>,
) -> Response {
    let server = match resolve_server(&state, req.server_id) {
        Ok(server) => server,
        Err(response) => return response,
    };
    state.store.set_target_server(server);
    ok(StatusCode::OK, state.store.target_server().get())
}

pub async fn reload_products(State(state): State<AppState>) -> Response {
    lookup_response(state.cascade.load_products().await)
}

pub async fn select_product(
    State(state): State<AppState>,
    Json(req): Json<SelectProductRequest>,
) -> Response {
    lookup_response(state.cascade.select_product(req.product).await)
}

pub async fn select_source(
    State(state): State<AppState>,
    Json(req): Json<SelectSourceRequest>,
) -> Response {
    lookup_response(state.cascade.select_source(req.source).await)
}

pub async fn select_targets(
    State(state): State<AppState>,
    Json(req): Json<SelectTargetsRequest>,
) -> Response {
    state.cascade.select_targets(req.targets);
    ok(StatusCode::OK, state.store.selected_targets().get())
}

pub async fn assign_targets(State(state): State<AppState>) -> Response {
    match state.cascade.assign_selected_targets() {
        Ok(report) => ok(
            StatusCode::OK,
            AssignmentDto {
                added: report.added,
                duplicates: report.duplicates,
                unresolved: report.unresolved,
            },
        ),
        Err(err) => assign_error(err),
    }
}

/// `serverId` 为空表示清除；不存在的 id 返回 404。
fn resolve_server(state: &AppState, server_id: Option<i64>) -> Result<Option<Server>, Response> {
    let Some(server_id) = server_id else {
        return Ok(None);
    };
    state
        .store
        .servers()
        .get()
        .into_iter()
        .find(|server| server.id == server_id)
        .map(Some)
        .ok_or_else(not_found_error)
}

fn lookup_response(result: Result<LookupOutcome, CascadeError>) -> Response {
    match result {
        Ok(outcome) => ok(
            StatusCode::OK,
            LookupDto {
                applied: outcome.is_applied(),
            },
        ),
        Err(err) => lookup_error(err),
    }
}
