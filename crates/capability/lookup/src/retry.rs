//! 查询重试
//!
//! 网络层错误与 5xx 按查询类型重试：产品列表最多 2 次，源服务/候选端口各 1 次。
//! 其余错误立即返回。

use crate::error::LookupError;
use crate::traits::LookupSource;
use api_contract::{PortRequest, SourceRequest};
use async_trait::async_trait;
use domain::{CandidatePort, Product, SourceService};
use portmap_telemetry::{record_lookup_failure, record_lookup_issued, record_lookup_retry};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 各查询的重试次数（不含首次请求）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub product_retries: u32,
    pub source_retries: u32,
    pub port_retries: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            product_retries: 2,
            source_retries: 1,
            port_retries: 1,
            backoff_ms: 0,
        }
    }
}

/// 带重试的查询装饰器。
pub struct RetryingLookup {
    inner: Arc<dyn LookupSource>,
    policy: RetryPolicy,
}

impl RetryingLookup {
    pub fn new(inner: Arc<dyn LookupSource>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl LookupSource for RetryingLookup {
    async fn list_products(&self) -> Result<Vec<Product>, LookupError> {
        with_retry(
            "list_products",
            self.policy.product_retries,
            self.policy.backoff_ms,
            || self.inner.list_products(),
        )
        .await
    }

    async fn list_sources(
        &self,
        request: &SourceRequest,
    ) -> Result<Vec<SourceService>, LookupError> {
        with_retry(
            "list_sources",
            self.policy.source_retries,
            self.policy.backoff_ms,
            || self.inner.list_sources(request),
        )
        .await
    }

    async fn list_ports(&self, request: &PortRequest) -> Result<Vec<CandidatePort>, LookupError> {
        with_retry(
            "list_ports",
            self.policy.port_retries,
            self.policy.backoff_ms,
            || self.inner.list_ports(request),
        )
        .await
    }
}

/// 执行查询，可重试错误最多再试 `max_retries` 次。
pub async fn with_retry<T, F, Fut>(
    operation: &'static str,
    max_retries: u32,
    backoff_ms: u64,
    mut call: F,
) -> Result<T, LookupError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LookupError>>,
{
    record_lookup_issued();
    let mut attempt = 0u32;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= max_retries {
                    record_lookup_failure();
                    warn!(
                        target: "portmap.lookup",
                        operation,
                        attempts = attempt + 1,
                        error = %err,
                        "lookup_failed"
                    );
                    return Err(err);
                }
                attempt += 1;
                record_lookup_retry();
                debug!(target: "portmap.lookup", operation, attempt, error = %err, "lookup_retry");
                if backoff_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }
}
