//! 查询接口 Trait 定义
//!
//! 三个查询依次依赖：产品名 → 源服务 → (fromPort, productName, section)。

use crate::error::LookupError;
use api_contract::{PortRequest, SourceRequest};
use async_trait::async_trait;
use domain::{CandidatePort, Product, SourceService};

#[async_trait]
pub trait LookupSource: Send + Sync {
    /// 列出全部产品
    async fn list_products(&self) -> Result<Vec<Product>, LookupError>;

    /// 列出暴露该产品的源服务
    async fn list_sources(&self, request: &SourceRequest)
    -> Result<Vec<SourceService>, LookupError>;

    /// 列出源服务对应的候选端口
    async fn list_ports(&self, request: &PortRequest) -> Result<Vec<CandidatePort>, LookupError>;
}
