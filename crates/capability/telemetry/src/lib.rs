//! 追踪、请求 ID 与进程级计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub lookups_issued: u64,
    pub lookup_failures: u64,
    pub lookup_retries: u64,
    pub lookups_superseded: u64,
    pub mappings_added: u64,
    pub mappings_duplicate: u64,
    pub targets_unresolved: u64,
    pub snapshot_saves: u64,
    pub snapshot_save_failures: u64,
}

/// 进程级计数器。
pub struct TelemetryMetrics {
    lookups_issued: AtomicU64,
    lookup_failures: AtomicU64,
    lookup_retries: AtomicU64,
    lookups_superseded: AtomicU64,
    mappings_added: AtomicU64,
    mappings_duplicate: AtomicU64,
    targets_unresolved: AtomicU64,
    snapshot_saves: AtomicU64,
    snapshot_save_failures: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            lookups_issued: AtomicU64::new(0),
            lookup_failures: AtomicU64::new(0),
            lookup_retries: AtomicU64::new(0),
            lookups_superseded: AtomicU64::new(0),
            mappings_added: AtomicU64::new(0),
            mappings_duplicate: AtomicU64::new(0),
            targets_unresolved: AtomicU64::new(0),
            snapshot_saves: AtomicU64::new(0),
            snapshot_save_failures: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lookups_issued: self.lookups_issued.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
            lookup_retries: self.lookup_retries.load(Ordering::Relaxed),
            lookups_superseded: self.lookups_superseded.load(Ordering::Relaxed),
            mappings_added: self.mappings_added.load(Ordering::Relaxed),
            mappings_duplicate: self.mappings_duplicate.load(Ordering::Relaxed),
            targets_unresolved: self.targets_unresolved.load(Ordering::Relaxed),
            snapshot_saves: self.snapshot_saves.load(Ordering::Relaxed),
            snapshot_save_failures: self.snapshot_save_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录发起的外部查询次数（不含重试）。
pub fn record_lookup_issued() {
    metrics().lookups_issued.fetch_add(1, Ordering::Relaxed);
}

/// 记录重试耗尽后的查询失败次数。
pub fn record_lookup_failure() {
    metrics().lookup_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录查询重试次数。
pub fn record_lookup_retry() {
    metrics().lookup_retries.fetch_add(1, Ordering::Relaxed);
}

/// 记录被更新选择取代而丢弃的查询结果。
pub fn record_lookup_superseded() {
    metrics().lookups_superseded.fetch_add(1, Ordering::Relaxed);
}

/// 记录新增映射数。
pub fn record_mappings_added(count: u64) {
    metrics().mappings_added.fetch_add(count, Ordering::Relaxed);
}

/// 记录因唯一键重复而忽略的映射数。
pub fn record_mappings_duplicate(count: u64) {
    metrics()
        .mappings_duplicate
        .fetch_add(count, Ordering::Relaxed);
}

/// 记录无法回查到候选端口的目标数。
pub fn record_target_unresolved() {
    metrics()
        .targets_unresolved
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录快照写入成功次数。
pub fn record_snapshot_save() {
    metrics().snapshot_saves.fetch_add(1, Ordering::Relaxed);
}

/// 记录快照写入失败次数。
pub fn record_snapshot_save_failure() {
    metrics()
        .snapshot_save_failures
        .fetch_add(1, Ordering::Relaxed);
}
