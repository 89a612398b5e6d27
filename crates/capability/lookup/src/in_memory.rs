//! 查询内存实现
//!
//! 用于本地演示和测试：按产品名索引源服务，按 (fromPort, productName, section) 索引候选端口。

use crate::error::LookupError;
use crate::traits::LookupSource;
use api_contract::{PortRequest, SourceRequest};
use async_trait::async_trait;
use domain::{CandidatePort, Product, SourceService};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Catalog {
    products: Vec<Product>,
    sources: HashMap<String, Vec<SourceService>>,
    ports: HashMap<(String, String, String), Vec<CandidatePort>>,
}

/// 内存查询目录
///
/// 通过 `with_*` 构造目录，读取使用 RwLock。
#[derive(Default)]
pub struct InMemoryLookup {
    catalog: RwLock<Catalog>,
}

impl InMemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(self, products: Vec<Product>) -> Self {
        if let Ok(mut catalog) = self.catalog.write() {
            catalog.products = products;
        }
        self
    }

    pub fn with_sources(self, product_name: &str, sources: Vec<SourceService>) -> Self {
        if let Ok(mut catalog) = self.catalog.write() {
            catalog.sources.insert(product_name.to_string(), sources);
        }
        self
    }

    /// 为源服务登记候选端口（键取自源服务的 fromPort/section 与给定产品名）。
    pub fn with_ports(
        self,
        source: &SourceService,
        product_name: &str,
        ports: Vec<CandidatePort>,
    ) -> Self {
        if let Ok(mut catalog) = self.catalog.write() {
            catalog.ports.insert(
                (
                    source.from_port.clone(),
                    product_name.to_string(),
                    source.section.clone(),
                ),
                ports,
            );
        }
        self
    }
}

#[async_trait]
impl LookupSource for InMemoryLookup {
    async fn list_products(&self) -> Result<Vec<Product>, LookupError> {
        let catalog = self
            .catalog
            .read()
            .map_err(|_| LookupError::Transport("lock failed".to_string()))?;
        Ok(catalog.products.clone())
    }

    async fn list_sources(
        &self,
        request: &SourceRequest,
    ) -> Result<Vec<SourceService>, LookupError> {
        let catalog = self
            .catalog
            .read()
            .map_err(|_| LookupError::Transport("lock failed".to_string()))?;
        Ok(catalog
            .sources
            .get(&request.product_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_ports(&self, request: &PortRequest) -> Result<Vec<CandidatePort>, LookupError> {
        let catalog = self
            .catalog
            .read()
            .map_err(|_| LookupError::Transport("lock failed".to_string()))?;
        let key = (
            request.from_port.clone(),
            request.product_name.clone(),
            request.section.clone(),
        );
        Ok(catalog.ports.get(&key).cloned().unwrap_or_default())
    }
}
