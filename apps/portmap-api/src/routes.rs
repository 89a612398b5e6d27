//! 路由定义
//!
//! 集中管理所有 API 路由，将路径映射到对应的 handlers。
//! 路由包括：
//! - 健康检查：/health
//! - 会话状态：/state
//! - 服务器管理：/servers/*
//! - 级联选择：/selection/*
//! - 映射管理：/mappings/*

use super::AppState;
use super::handlers::*;
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// 创建 API 路由
///
/// 返回包含所有 API 端点的 Router，由调用方挂载到 / 和 /api/ 两种前缀
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/state", get(get_state).delete(clear_state))
        .route("/servers", get(list_servers).post(create_server))
        .route(
            "/servers/:server_id",
            put(update_server).delete(delete_server),
        )
        .route("/selection", get(get_selection))
        .route("/selection/source-server", put(select_source_server))
        .route("/selection/target-server", put(select_target_server))
        .route("/selection/products/reload", post(reload_products))
        .route("/selection/product", put(select_product))
        .route("/selection/source", put(select_source))
        .route("/selection/targets", put(select_targets))
        .route("/selection/assign", post(assign_targets))
        .route("/mappings", get(list_mappings))
        .route("/mappings/export", get(export_mappings))
        .route("/mappings/import", post(import_mappings))
        .route("/mappings/:mapping_id", delete(delete_mapping))
        .route(
            "/mappings/:mapping_id/target-server",
            put(update_mapping_target_server),
        )
}
