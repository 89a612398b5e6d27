//! 状态快照持久化
//!
//! 将配置状态的完整快照序列化为单个 JSON 记录写入会话存储，并在启动时恢复一次：
//! - 保存：每次状态变更后整体覆盖写入，失败只记录日志
//! - 恢复：只合并记录中存在且可解析的字段，其余字段保持默认值
//! - 清除：删除记录
//!
//! 持久化是尽力而为的：任何读写错误都不会传播给状态仓库。

use crate::error::StorageError;
use crate::traits::SessionStore;
use domain::{PortMapping, Product, Server, SourceService, TargetSummary};
use portmap_telemetry::{record_snapshot_save, record_snapshot_save_failure};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// 默认快照键。
pub const DEFAULT_SNAPSHOT_KEY: &str = "port-configuration-state";

/// 配置状态的完整快照（八个状态切片）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub source_server: Option<Server>,
    pub target_server: Option<Server>,
    pub last_modified_server: Option<Server>,
    pub servers: Vec<Server>,
    pub selected_product: Option<Product>,
    pub selected_source: Option<SourceService>,
    pub selected_targets: Vec<TargetSummary>,
    pub mappings: Vec<PortMapping>,
}

/// 从记录中恢复出的字段；`None` 表示记录中缺失、为 null 或无法解析。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoredState {
    pub source_server: Option<Server>,
    pub target_server: Option<Server>,
    pub last_modified_server: Option<Server>,
    pub servers: Option<Vec<Server>>,
    pub selected_product: Option<Product>,
    pub selected_source: Option<SourceService>,
    pub selected_targets: Option<Vec<TargetSummary>>,
    pub mappings: Option<Vec<PortMapping>>,
}

impl RestoredState {
    /// 将存在的字段合并到默认快照上。
    pub fn into_snapshot(self) -> StateSnapshot {
        StateSnapshot {
            source_server: self.source_server,
            target_server: self.target_server,
            last_modified_server: self.last_modified_server,
            servers: self.servers.unwrap_or_default(),
            selected_product: self.selected_product,
            selected_source: self.selected_source,
            selected_targets: self.selected_targets.unwrap_or_default(),
            mappings: self.mappings.unwrap_or_default(),
        }
    }
}

/// 快照持久化适配器
#[derive(Clone)]
pub struct SnapshotPersistence {
    backend: Arc<dyn SessionStore>,
    key: String,
}

impl SnapshotPersistence {
    pub fn new(backend: Arc<dyn SessionStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn with_default_key(backend: Arc<dyn SessionStore>) -> Self {
        Self::new(backend, DEFAULT_SNAPSHOT_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// 读取并解析快照；任何错误均视为没有已保存的状态。
    pub fn load(&self) -> RestoredState {
        if !self.backend.is_available() {
            return RestoredState::default();
        }
        let raw = match self.backend.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return RestoredState::default(),
            Err(err) => {
                warn!(target: "portmap.storage", key = %self.key, error = %err, "snapshot_read_failed");
                return RestoredState::default();
            }
        };
        match parse_snapshot(&raw) {
            Ok(restored) => {
                debug!(target: "portmap.storage", key = %self.key, "snapshot_restored");
                restored
            }
            Err(err) => {
                warn!(target: "portmap.storage", key = %self.key, error = %err, "snapshot_parse_failed");
                RestoredState::default()
            }
        }
    }

    /// 写入完整快照；失败只记录日志。
    pub fn save(&self, snapshot: &StateSnapshot) {
        if !self.backend.is_available() {
            return;
        }
        match self.try_save(snapshot) {
            Ok(()) => record_snapshot_save(),
            Err(err) => {
                record_snapshot_save_failure();
                warn!(target: "portmap.storage", key = %self.key, error = %err, "snapshot_save_failed");
            }
        }
    }

    /// 删除快照记录；失败只记录日志。
    pub fn clear(&self) {
        if !self.backend.is_available() {
            return;
        }
        if let Err(err) = self.backend.remove_item(&self.key) {
            warn!(target: "portmap.storage", key = %self.key, error = %err, "snapshot_clear_failed");
        }
    }

    fn try_save(&self, snapshot: &StateSnapshot) -> Result<(), StorageError> {
        let data = serde_json::to_string(snapshot)?;
        self.backend.set_item(&self.key, &data)
    }
}

/// 按字段解析快照记录。
///
/// 顶层必须是 JSON 对象；单个字段类型不符时只丢弃该字段。
pub fn parse_snapshot(raw: &str) -> Result<RestoredState, StorageError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(object) = value else {
        return Err(StorageError::new("snapshot is not a JSON object"));
    };
    Ok(RestoredState {
        source_server: field(&object, "sourceServer"),
        target_server: field(&object, "targetServer"),
        last_modified_server: field(&object, "lastModifiedServer"),
        servers: field(&object, "servers"),
        selected_product: field(&object, "selectedProduct"),
        selected_source: field(&object, "selectedSource"),
        selected_targets: field(&object, "selectedTargets"),
        mappings: field(&object, "mappings"),
    })
}

fn field<T: DeserializeOwned>(object: &Map<String, Value>, name: &str) -> Option<T> {
    let value = object.get(name)?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(target: "portmap.storage", field = name, error = %err, "snapshot_field_skipped");
            None
        }
    }
}
