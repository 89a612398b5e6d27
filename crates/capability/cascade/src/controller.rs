//! 级联选择控制器
//!
//! 控制器持有查询结果视图（产品、源服务、候选端口及其展示投影）和当前阶段，
//! 选择本身写入状态仓库。
//!
//! 规则：
//! - 选择产品：仓库级联清除源服务与目标；候选端口视图随之清空；按产品名查询源服务
//! - 选择源服务：列表载荷取第一项；仓库清除所选目标；按 (fromPort, productName, section) 查询候选端口
//! - 切换源服务器（包括新建服务器、删除当前源服务器）：作废全部在途查询，回到 `NoProduct` 并重新加载产品
//! - 重置状态：作废全部在途查询并清空查询结果视图
//! - 查询失败：对应视图保持原值，返回错误
//! - 过期结果（已有更新的同类查询发起）：丢弃，返回 [`LookupOutcome::Superseded`]

use crate::error::CascadeError;
use crate::sequence::{LookupKind, LookupSequence, Ticket};
use api_contract::{PortRequest, SourceRequest};
use domain::{
    CandidatePort, OneOrMany, Product, Server, ServerDraft, SourceService, TargetSummary,
};
use portmap_lookup::{LookupError, LookupSource};
use portmap_state::{ConfigurationStore, Slice, SliceView, StateError};
use portmap_telemetry::record_lookup_superseded;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 流程阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStage {
    NoProduct,
    ProductChosen,
    SourceChosen,
    TargetsLoaded,
    Assigned,
}

impl CascadeStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CascadeStage::NoProduct => "no_product",
            CascadeStage::ProductChosen => "product_chosen",
            CascadeStage::SourceChosen => "source_chosen",
            CascadeStage::TargetsLoaded => "targets_loaded",
            CascadeStage::Assigned => "assigned",
        }
    }
}

/// 一次查询的结果去向。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// 结果已写入视图。
    Applied,
    /// 期间发起了更新的同类查询，结果被丢弃。
    Superseded,
    /// 选择为空，没有发起查询。
    Skipped,
}

impl LookupOutcome {
    pub fn is_applied(self) -> bool {
        self == LookupOutcome::Applied
    }
}

/// 级联选择控制器。
pub struct SelectionCascade {
    pub(crate) store: Arc<ConfigurationStore>,
    lookup: Arc<dyn LookupSource>,
    sequence: LookupSequence,
    products: Slice<Vec<Product>>,
    sources: Slice<Vec<SourceService>>,
    pub(crate) ports: Slice<Vec<CandidatePort>>,
    targets: Slice<Vec<TargetSummary>>,
    pub(crate) stage: Slice<CascadeStage>,
}

impl SelectionCascade {
    pub fn new(store: Arc<ConfigurationStore>, lookup: Arc<dyn LookupSource>) -> Self {
        let stage = if store.selected_product().get().is_none() {
            CascadeStage::NoProduct
        } else if store.selected_source().get().is_none() {
            CascadeStage::ProductChosen
        } else {
            CascadeStage::SourceChosen
        };
        Self {
            store,
            lookup,
            sequence: LookupSequence::new(),
            products: Slice::new("products", Vec::new()),
            sources: Slice::new("sources", Vec::new()),
            ports: Slice::new("ports", Vec::new()),
            targets: Slice::new("targets", Vec::new()),
            stage: Slice::new("stage", stage),
        }
    }

    pub fn store(&self) -> &Arc<ConfigurationStore> {
        &self.store
    }

    pub fn products(&self) -> SliceView<'_, Vec<Product>> {
        self.products.view()
    }

    pub fn sources(&self) -> SliceView<'_, Vec<SourceService>> {
        self.sources.view()
    }

    /// 候选端口（分配时按 id 回查的权威列表）。
    pub fn ports(&self) -> SliceView<'_, Vec<CandidatePort>> {
        self.ports.view()
    }

    /// 候选端口的展示投影。
    pub fn targets(&self) -> SliceView<'_, Vec<TargetSummary>> {
        self.targets.view()
    }

    pub fn stage(&self) -> SliceView<'_, CascadeStage> {
        self.stage.view()
    }

    /// 加载产品列表。
    pub async fn load_products(&self) -> Result<LookupOutcome, CascadeError> {
        let ticket = self.sequence.issue(LookupKind::Products);
        let result = self.lookup.list_products().await;
        self.finish(ticket, result, |products| {
            debug!(target: "portmap.cascade", count = products.len(), "products_loaded");
            self.products.set(products);
        })
    }

    /// 切换源服务器：清除下游选择、回到 `NoProduct` 并重新加载产品。
    pub async fn set_source_server(
        &self,
        server: Option<Server>,
    ) -> Result<LookupOutcome, CascadeError> {
        self.invalidate_all();
        info!(
            target: "portmap.cascade",
            server_id = server.as_ref().map(|s| s.id),
            "source_server_changed"
        );
        self.store.set_source_server(server);
        self.store.set_selected_product(None);
        self.store.set_selected_source(None);
        self.clear_views();
        self.load_products().await
    }

    /// 保存服务器表单；新建的服务器成为源服务器，流程随之重新开始。
    ///
    /// 重新加载产品失败只记录日志，服务器已保存。
    pub async fn save_server(&self, draft: &ServerDraft) -> Result<Server, StateError> {
        let saved = self.store.save_server(draft)?;
        if draft.id.is_none() {
            self.restart_with(Some(saved.clone())).await;
        }
        Ok(saved)
    }

    /// 删除服务器；被删除的是源服务器时流程重新开始。
    pub async fn remove_server(&self, server_id: i64) -> bool {
        let was_source = self
            .store
            .source_server()
            .get()
            .is_some_and(|server| server.id == server_id);
        if !self.store.remove_server(server_id) {
            return false;
        }
        if was_source {
            self.restart_with(None).await;
        }
        true
    }

    /// 作废全部在途查询，清空查询结果视图并回到 `NoProduct`。
    pub fn reset(&self) {
        self.invalidate_all();
        self.clear_views();
        debug!(target: "portmap.cascade", "cascade_reset");
    }

    /// 重置状态仓库与流程。
    pub fn clear_state(&self) {
        self.store.clear_state();
        self.reset();
    }

    /// 选择产品并查询其源服务。
    pub async fn select_product(
        &self,
        product: Option<Product>,
    ) -> Result<LookupOutcome, CascadeError> {
        let changed = self.store.set_selected_product(product.clone());
        if changed {
            self.sequence
                .invalidate(&[LookupKind::Sources, LookupKind::Ports]);
            self.clear_ports();
        }
        let Some(product) = product else {
            self.sources.set(Vec::new());
            self.stage.set(CascadeStage::NoProduct);
            return Ok(LookupOutcome::Skipped);
        };
        self.stage.set(CascadeStage::ProductChosen);

        let ticket = self.sequence.issue(LookupKind::Sources);
        let request = SourceRequest {
            product_name: product.name.clone(),
        };
        debug!(target: "portmap.cascade", product = %product.name, "sources_lookup_issued");
        let result = self.lookup.list_sources(&request).await;
        self.finish(ticket, result, |sources| {
            debug!(target: "portmap.cascade", count = sources.len(), "sources_loaded");
            self.sources.set(sources);
        })
    }

    /// 选择源服务并查询候选端口；列表载荷只取第一项。
    pub async fn select_source(
        &self,
        source: Option<OneOrMany<SourceService>>,
    ) -> Result<LookupOutcome, CascadeError> {
        let source = source.and_then(OneOrMany::into_first);
        self.store.set_selected_source(source.clone());
        let Some(source) = source else {
            self.sequence.invalidate(&[LookupKind::Ports]);
            let stage = if self.store.selected_product().get().is_some() {
                CascadeStage::ProductChosen
            } else {
                CascadeStage::NoProduct
            };
            self.stage.set(stage);
            return Ok(LookupOutcome::Skipped);
        };
        self.stage.set(CascadeStage::SourceChosen);

        let product_name = self
            .store
            .selected_product()
            .get()
            .map(|product| product.name)
            .unwrap_or_else(|| source.product.clone());
        let request = PortRequest::for_source(&source, &product_name);
        let ticket = self.sequence.issue(LookupKind::Ports);
        debug!(
            target: "portmap.cascade",
            source_id = %source.id,
            from_port = %request.from_port,
            section = %request.section,
            "ports_lookup_issued"
        );
        let result = self.lookup.list_ports(&request).await;
        self.finish(ticket, result, |ports| {
            debug!(target: "portmap.cascade", count = ports.len(), "ports_loaded");
            self.targets
                .set(ports.iter().map(TargetSummary::from).collect());
            self.ports.set(ports);
            self.stage.set(CascadeStage::TargetsLoaded);
        })
    }

    /// 选择目标（单个或列表；`None` 清空）。
    pub fn select_targets(&self, targets: Option<OneOrMany<TargetSummary>>) {
        let targets = targets.map(OneOrMany::into_vec).unwrap_or_default();
        self.store.set_selected_targets(targets);
    }

    async fn restart_with(&self, server: Option<Server>) {
        if let Err(err) = self.set_source_server(server).await {
            warn!(target: "portmap.cascade", error = %err, "products_reload_failed");
        }
    }

    fn invalidate_all(&self) {
        self.sequence.invalidate(&[
            LookupKind::Products,
            LookupKind::Sources,
            LookupKind::Ports,
        ]);
    }

    fn clear_views(&self) {
        self.sources.set(Vec::new());
        self.clear_ports();
        self.stage.set(CascadeStage::NoProduct);
    }

    fn clear_ports(&self) {
        self.ports.set(Vec::new());
        self.targets.set(Vec::new());
    }

    fn finish<T>(
        &self,
        ticket: Ticket,
        result: Result<T, LookupError>,
        apply: impl FnOnce(T),
    ) -> Result<LookupOutcome, CascadeError> {
        match result {
            Ok(value) => {
                if self.sequence.apply_if_current(ticket, || apply(value)) {
                    Ok(LookupOutcome::Applied)
                } else {
                    self.superseded(ticket);
                    Ok(LookupOutcome::Superseded)
                }
            }
            Err(_) if !self.sequence.is_current(ticket) => {
                self.superseded(ticket);
                Ok(LookupOutcome::Superseded)
            }
            Err(err) => {
                warn!(
                    target: "portmap.cascade",
                    lookup = ticket.kind.as_str(),
                    error = %err,
                    "lookup_failed_state_kept"
                );
                Err(CascadeError::Lookup(err))
            }
        }
    }

    fn superseded(&self, ticket: Ticket) {
        record_lookup_superseded();
        debug!(
            target: "portmap.cascade",
            lookup = ticket.kind.as_str(),
            seq = ticket.seq,
            "lookup_superseded"
        );
    }
}
