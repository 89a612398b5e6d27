//! 外部查询服务返回的只读数据。
//!
//! 这些记录只由查询结果整体替换，从不在本地创建。

use serde::{Deserialize, Serialize};

/// 产品。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
}

/// 暴露某产品的源服务。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceService {
    pub id: String,
    #[serde(default)]
    pub from_port: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub section: String,
}

/// 目标侧候选端口（尚未提交为映射）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePort {
    pub id: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub from_port: String,
    #[serde(default)]
    pub to_port: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub description: String,
}

/// 候选端口的展示投影。
///
/// `id` 与源候选端口一致，分配时据此回查完整记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSummary {
    pub id: String,
    #[serde(default)]
    pub to_port: String,
    #[serde(default)]
    pub product: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&CandidatePort> for TargetSummary {
    fn from(port: &CandidatePort) -> Self {
        Self {
            id: port.id.clone(),
            to_port: port.to_port.clone(),
            product: port.product.clone(),
            protocol: non_empty(&port.protocol),
            port: non_empty(&port.port),
            from_port: non_empty(&port.from_port),
            section: non_empty(&port.section),
            description: non_empty(&port.description),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_keeps_id_and_drops_empty_fields() {
        let port = CandidatePort {
            id: "p1".to_string(),
            product: "App".to_string(),
            from_port: "80".to_string(),
            to_port: "443".to_string(),
            protocol: String::new(),
            port: "443".to_string(),
            section: "web".to_string(),
            description: String::new(),
        };
        let summary = TargetSummary::from(&port);
        assert_eq!(summary.id, "p1");
        assert_eq!(summary.port.as_deref(), Some("443"));
        assert!(summary.protocol.is_none());
        assert!(summary.description.is_none());
    }

    #[test]
    fn candidate_tolerates_missing_fields() {
        let port: CandidatePort =
            serde_json::from_str(r#"{"id":"p9","toPort":"22","port":"22"}"#).expect("parse");
        assert_eq!(port.protocol, "");
        assert_eq!(port.to_port, "22");
    }
}
