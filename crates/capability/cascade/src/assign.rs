//! 目标分配：把所选目标转换为映射。
//!
//! 前置条件：已选目标服务器、已选源服务、至少一个所选目标。不满足时不做任何修改，
//! 返回一个列出全部缺失项的错误。
//!
//! 每个所选目标按 id 回查已加载的候选端口；回查失败的目标记录日志后跳过。
//! 批次提交后清空所选目标，阶段回到 `TargetsLoaded`。

use crate::controller::{CascadeStage, SelectionCascade};
use crate::error::{AssignError, MissingSelection};
use domain::{CandidatePort, PortMapping, Product, Server, SourceService, UNKNOWN_SERVER};
use portmap_telemetry::record_target_unresolved;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

const DEFAULT_PROTOCOL: &str = "TCP";
const ID_SUFFIX_LEN: usize = 9;

/// 分配结果。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignmentReport {
    /// 新增映射数。
    pub added: usize,
    /// 因唯一键已存在而未新增的映射数。
    pub duplicates: usize,
    /// 无法回查到候选端口的目标数。
    pub unresolved: usize,
}

impl SelectionCascade {
    /// 把所选目标分配到当前目标服务器。
    pub fn assign_selected_targets(&self) -> Result<AssignmentReport, AssignError> {
        let target_server = self.store.target_server().get();
        let source = self.store.selected_source().get();
        let selected = self.store.selected_targets().get();

        let mut missing = Vec::new();
        if target_server.is_none() {
            missing.push(MissingSelection::TargetServer);
        }
        if source.is_none() {
            missing.push(MissingSelection::Source);
        }
        if selected.is_empty() {
            missing.push(MissingSelection::Targets);
        }
        if !missing.is_empty() {
            let err = AssignError::MissingSelection(missing);
            warn!(target: "portmap.cascade", error = %err, "assignment_rejected");
            return Err(err);
        }

        let source_server = self.store.source_server().get();
        let product = self.store.selected_product().get();
        let ports = self.ports.get();
        let mut report = AssignmentReport::default();
        let mut batch = Vec::with_capacity(selected.len());
        for target in &selected {
            let Some(port) = ports.iter().find(|port| port.id == target.id) else {
                record_target_unresolved();
                warn!(target: "portmap.cascade", target_id = %target.id, "target_unresolved");
                report.unresolved += 1;
                continue;
            };
            batch.push(build_mapping(
                source_server.as_ref(),
                target_server.as_ref(),
                source.as_ref(),
                product.as_ref(),
                port,
            ));
        }

        let built = batch.len();
        report.added = self.store.add_mappings(batch);
        report.duplicates = built - report.added;
        self.store.set_selected_targets(Vec::new());
        self.stage.set(CascadeStage::Assigned);
        self.stage.set(CascadeStage::TargetsLoaded);
        info!(
            target: "portmap.cascade",
            added = report.added,
            duplicates = report.duplicates,
            unresolved = report.unresolved,
            "targets_assigned"
        );
        Ok(report)
    }
}

/// 由当前选择与候选端口构造映射。
pub fn build_mapping(
    source_server: Option<&Server>,
    target_server: Option<&Server>,
    source: Option<&SourceService>,
    product: Option<&Product>,
    port: &CandidatePort,
) -> PortMapping {
    let server_name = |server: Option<&Server>| {
        server
            .map(|server| server.name.clone())
            .unwrap_or_else(|| UNKNOWN_SERVER.to_string())
    };
    let section = source
        .map(|source| source.section.as_str())
        .filter(|section| !section.is_empty())
        .unwrap_or(port.section.as_str());
    PortMapping {
        id: new_mapping_id(),
        source_server: server_name(source_server),
        source_server_id: source.map(|source| source.id.clone()).unwrap_or_default(),
        target_server: server_name(target_server),
        product: product
            .map(|product| product.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| port.product.clone()),
        protocol: if port.protocol.is_empty() {
            DEFAULT_PROTOCOL.to_string()
        } else {
            port.protocol.clone()
        },
        port: port.port.clone(),
        section: section.to_string(),
        description: port.description.clone(),
    }
}

/// 进程内唯一的映射 id：毫秒时间戳 + 随机后缀。
pub fn new_mapping_id() -> String {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{now_ms}-{}", &suffix[..ID_SUFFIX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port() -> CandidatePort {
        CandidatePort {
            id: "p1".to_string(),
            product: "App".to_string(),
            from_port: "80".to_string(),
            to_port: "443".to_string(),
            protocol: String::new(),
            port: "443".to_string(),
            section: "web".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn missing_context_uses_fallbacks() {
        let mapping = build_mapping(None, None, None, None, &port());
        assert_eq!(mapping.source_server, UNKNOWN_SERVER);
        assert_eq!(mapping.target_server, UNKNOWN_SERVER);
        assert_eq!(mapping.source_server_id, "");
        assert_eq!(mapping.product, "App");
        assert_eq!(mapping.protocol, "TCP");
        assert_eq!(mapping.section, "web");
        assert_eq!(mapping.description, "");
    }

    #[test]
    fn source_section_wins_over_candidate() {
        let source = SourceService {
            id: "s1".to_string(),
            from_port: "80".to_string(),
            product: "App".to_string(),
            section: "edge".to_string(),
        };
        let mapping = build_mapping(None, None, Some(&source), None, &port());
        assert_eq!(mapping.section, "edge");
        assert_eq!(mapping.source_server_id, "s1");
    }

    #[test]
    fn mapping_ids_are_distinct() {
        let first = new_mapping_id();
        let second = new_mapping_id();
        assert_ne!(first, second);
        let (_, suffix) = first.split_once('-').expect("separator");
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
    }
}
