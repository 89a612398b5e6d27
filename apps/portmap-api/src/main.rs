//! 端口映射配置 HTTP API。
//!
//! 驱动状态仓库与级联选择流程的 JSON 接口，附带请求追踪 ID。

mod handlers;
mod routes;
mod utils;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
};
use portmap_cascade::SelectionCascade;
use portmap_config::{AppConfig, SessionBackend};
use portmap_lookup::{HttpLookupClient, RetryPolicy, RetryingLookup};
use portmap_state::ConfigurationStore;
use portmap_storage::{SessionStoreKind, SnapshotPersistence, session_store_for};
use portmap_telemetry::{init_tracing, new_request_ids};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigurationStore>,
    pub cascade: Arc<SelectionCascade>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 会话快照存储：启动时恢复一次
    let kind = match config.session_backend {
        SessionBackend::Memory => SessionStoreKind::Memory,
        SessionBackend::Redis => SessionStoreKind::Redis,
        SessionBackend::None => SessionStoreKind::Noop,
    };
    let backend = session_store_for(kind, &config.redis_url, config.session_ttl_seconds)?;
    let persistence = SnapshotPersistence::new(backend, config.session_key.clone());
    let store = Arc::new(ConfigurationStore::open(persistence));
    if config.seed_servers {
        store.seed_demo_servers();
    }

    // 外部查询服务（带重试）
    let client = HttpLookupClient::new(
        config.lookup_base_url.clone(),
        Duration::from_millis(config.lookup_timeout_ms),
    )?;
    let policy = RetryPolicy {
        product_retries: config.lookup_product_retries,
        source_retries: config.lookup_source_retries,
        port_retries: config.lookup_port_retries,
        backoff_ms: config.lookup_backoff_ms,
    };
    let lookup = Arc::new(RetryingLookup::new(Arc::new(client), policy));
    let cascade = Arc::new(SelectionCascade::new(store.clone(), lookup));

    // 预加载产品列表；失败不影响启动
    if let Err(err) = cascade.load_products().await {
        warn!(target: "portmap.api", error = %err, "initial_products_unavailable");
    }

    let app = build_app(AppState { store, cascade });
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "portmap.api", addr = %config.http_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// 组装路由：同时挂在 `/` 与 `/api` 下。
pub fn build_app(state: AppState) -> Router {
    let api = routes::create_api_router();
    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 注入 request_id/trace_id
        .layer(middleware::from_fn(request_context))
}

async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    // 生成 request_id 与 trace_id，并注入请求扩展与日志
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}
