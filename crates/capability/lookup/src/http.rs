//! 外部查询服务 HTTP 实现
//!
//! 接口约定：
//! - `GET {base}/`：产品列表
//! - `POST {base}/source`：`{productName}` → 源服务列表
//! - `POST {base}/allPorts`：`{fromPort, productName, section}` → 候选端口列表
//!
//! 本实现不做重试，重试由 [`crate::RetryingLookup`] 负责。

use crate::error::LookupError;
use crate::traits::LookupSource;
use api_contract::{PortRequest, SourceRequest};
use async_trait::async_trait;
use domain::{CandidatePort, Product, SourceService};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub struct HttpLookupClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLookupClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| LookupError::Transport(err.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

async fn decode<T: DeserializeOwned>(
    result: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, LookupError> {
    let response = result.map_err(|err| LookupError::Transport(err.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        let message = status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string();
        return Err(LookupError::Status {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|err| LookupError::Decode(err.to_string()))
}

#[async_trait]
impl LookupSource for HttpLookupClient {
    async fn list_products(&self) -> Result<Vec<Product>, LookupError> {
        decode(self.client.get(self.url("")).send().await).await
    }

    async fn list_sources(
        &self,
        request: &SourceRequest,
    ) -> Result<Vec<SourceService>, LookupError> {
        decode(self.client.post(self.url("source")).json(request).send().await).await
    }

    async fn list_ports(&self, request: &PortRequest) -> Result<Vec<CandidatePort>, LookupError> {
        decode(self.client.post(self.url("allPorts")).json(request).send().await).await
    }
}
