//! 配置状态仓库
//!
//! 八个状态切片：`sourceServer`、`targetServer`、`lastModifiedServer`、`servers`、
//! `selectedProduct`、`selectedSource`、`selectedTargets`、`mappings`。
//!
//! 变更方法全部同步、不返回错误（表单与导入除外），结束时写入一次完整快照。
//! 空输入（`None`）把切片设为空值。

use crate::error::StateError;
use crate::registry;
use crate::slice::{Slice, SliceView};
use domain::{
    PortMapping, Product, Server, ServerDraft, ServerRef, SourceService, TargetSummary,
};
use portmap_storage::{SnapshotPersistence, StateSnapshot};
use portmap_telemetry::{record_mappings_added, record_mappings_duplicate};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// 导入结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    /// 去重后写入的映射数。
    pub imported: usize,
    /// 载荷中的映射总数。
    pub total: usize,
}

/// 配置状态仓库。
pub struct ConfigurationStore {
    writer: Mutex<()>,
    persistence: SnapshotPersistence,
    source_server: Slice<Option<Server>>,
    target_server: Slice<Option<Server>>,
    last_modified_server: Slice<Option<Server>>,
    servers: Slice<Vec<Server>>,
    selected_product: Slice<Option<Product>>,
    selected_source: Slice<Option<SourceService>>,
    selected_targets: Slice<Vec<TargetSummary>>,
    mappings: Slice<Vec<PortMapping>>,
}

impl ConfigurationStore {
    /// 构造仓库并从持久化记录恢复一次。
    pub fn open(persistence: SnapshotPersistence) -> Self {
        let restored = persistence.load().into_snapshot();
        let store = Self::from_snapshot(persistence, restored);
        info!(
            target: "portmap.state",
            servers = store.servers.get().len(),
            mappings = store.mappings.get().len(),
            "store_opened"
        );
        store
    }

    fn from_snapshot(persistence: SnapshotPersistence, snapshot: StateSnapshot) -> Self {
        // 恢复的记录可能不完整或被手工修改，唯一性在这里重新建立
        let (servers, servers_dropped) = registry::dedupe_servers(snapshot.servers);
        let restored = registry::dedupe(snapshot.mappings);
        if servers_dropped > 0 || restored.duplicates > 0 {
            warn!(
                target: "portmap.state",
                servers_dropped,
                mappings_dropped = restored.duplicates,
                "restored_duplicates_dropped"
            );
        }
        let mappings = restored.accepted;
        let servers = registry::with_counts(&servers, &mappings);
        let sync = |server| registry::sync_server(server, &servers, &mappings);
        Self {
            writer: Mutex::new(()),
            source_server: Slice::new("sourceServer", sync(snapshot.source_server)),
            target_server: Slice::new("targetServer", sync(snapshot.target_server)),
            last_modified_server: Slice::new(
                "lastModifiedServer",
                sync(snapshot.last_modified_server),
            ),
            servers: Slice::new("servers", servers.clone()),
            selected_product: Slice::new("selectedProduct", snapshot.selected_product),
            selected_source: Slice::new("selectedSource", snapshot.selected_source),
            selected_targets: Slice::new("selectedTargets", snapshot.selected_targets),
            mappings: Slice::new("mappings", mappings),
            persistence,
        }
    }

    // ------------------------------------------------------------------
    // 只读视图
    // ------------------------------------------------------------------

    pub fn source_server(&self) -> SliceView<'_, Option<Server>> {
        self.source_server.view()
    }

    pub fn target_server(&self) -> SliceView<'_, Option<Server>> {
        self.target_server.view()
    }

    pub fn last_modified_server(&self) -> SliceView<'_, Option<Server>> {
        self.last_modified_server.view()
    }

    pub fn servers(&self) -> SliceView<'_, Vec<Server>> {
        self.servers.view()
    }

    pub fn selected_product(&self) -> SliceView<'_, Option<Product>> {
        self.selected_product.view()
    }

    pub fn selected_source(&self) -> SliceView<'_, Option<SourceService>> {
        self.selected_source.view()
    }

    pub fn selected_targets(&self) -> SliceView<'_, Vec<TargetSummary>> {
        self.selected_targets.view()
    }

    pub fn mappings(&self) -> SliceView<'_, Vec<PortMapping>> {
        self.mappings.view()
    }

    /// 全部切片的一致快照。
    pub fn current_state(&self) -> StateSnapshot {
        let _writer = self.begin();
        self.snapshot()
    }

    // ------------------------------------------------------------------
    // 服务器
    // ------------------------------------------------------------------

    /// 设置源服务器；非空时同时记为最近修改的服务器。
    pub fn set_source_server(&self, server: Option<Server>) {
        let _writer = self.begin();
        let server = self.synced(server);
        self.source_server.set(server.clone());
        if server.is_some() {
            self.last_modified_server.set(server);
        }
        self.persist();
    }

    pub fn set_target_server(&self, server: Option<Server>) {
        let _writer = self.begin();
        self.target_server.set(self.synced(server));
        self.persist();
    }

    pub fn set_last_modified_server(&self, server: Option<Server>) {
        let _writer = self.begin();
        self.last_modified_server.set(self.synced(server));
        self.persist();
    }

    /// 整体替换服务器列表（重复 id 保留第一条）。
    pub fn set_servers(&self, servers: Vec<Server>) {
        let _writer = self.begin();
        let (servers, dropped) = registry::dedupe_servers(servers);
        if dropped > 0 {
            warn!(target: "portmap.state", dropped, "duplicate_server_ids_dropped");
        }
        self.servers.set(servers);
        self.refresh_counts();
        self.persist();
    }

    /// 追加服务器；id 已存在时不做任何修改并返回 `false`。
    pub fn add_server(&self, server: Server) -> bool {
        let _writer = self.begin();
        if !self.add_server_locked(server) {
            return false;
        }
        self.persist();
        true
    }

    /// 按 id 更新服务器；改名会同步改写映射中的服务器名称。
    pub fn update_server(&self, server: Server) -> bool {
        let _writer = self.begin();
        if !self.update_server_locked(server) {
            return false;
        }
        self.persist();
        true
    }

    /// 删除服务器及引用它的全部映射，并清除指向它的源/目标服务器。
    pub fn remove_server(&self, server_id: i64) -> bool {
        let _writer = self.begin();
        let mut servers = self.servers.get();
        let Some(position) = servers.iter().position(|server| server.id == server_id) else {
            debug!(target: "portmap.state", server_id, "remove_server_not_found");
            return false;
        };
        let removed = servers.remove(position);
        self.servers.set(servers);

        let mut mappings = self.mappings.get();
        let before = mappings.len();
        mappings.retain(|mapping| !mapping.references(&removed.name));
        let purged = before - mappings.len();
        if purged > 0 {
            self.mappings.set(mappings);
        }

        if self.source_server.get().is_some_and(|server| server.id == server_id) {
            self.source_server.set(None);
        }
        if self.target_server.get().is_some_and(|server| server.id == server_id) {
            self.target_server.set(None);
        }
        self.refresh_counts();
        info!(
            target: "portmap.state",
            server_id,
            server_name = %removed.name,
            mappings_purged = purged,
            "server_removed"
        );
        self.persist();
        true
    }

    /// 保存服务器表单：无 id 时新建并设为源服务器，有 id 时修改名称与位置。
    pub fn save_server(&self, draft: &ServerDraft) -> Result<Server, StateError> {
        let draft = draft.validate()?;
        let _writer = self.begin();
        let saved = match draft.id {
            None => {
                let id = registry::next_server_id(&self.servers.get());
                self.add_server_locked(Server::new(id, draft.name, draft.location));
                let created = self.listed(id).ok_or(StateError::UnknownServer(id))?;
                self.source_server.set(Some(created.clone()));
                self.last_modified_server.set(Some(created.clone()));
                created
            }
            Some(id) => {
                let existing = self.listed(id).ok_or(StateError::UnknownServer(id))?;
                self.update_server_locked(existing.with_details(draft.name, draft.location));
                self.listed(id).ok_or(StateError::UnknownServer(id))?
            }
        };
        self.persist();
        Ok(saved)
    }

    /// 服务器列表为空时写入三台演示服务器。
    pub fn seed_demo_servers(&self) -> bool {
        let _writer = self.begin();
        if !self.servers.get().is_empty() {
            return false;
        }
        let servers = (1..=3)
            .map(|id| Server::new(id, format!("Server {id}"), format!("Location {id}")))
            .collect();
        self.servers.set(servers);
        self.refresh_counts();
        info!(target: "portmap.state", "demo_servers_seeded");
        self.persist();
        true
    }

    // ------------------------------------------------------------------
    // 选择
    // ------------------------------------------------------------------

    /// 设置所选产品；与当前值不同时清除所选源服务与目标。返回是否发生级联清除。
    pub fn set_selected_product(&self, product: Option<Product>) -> bool {
        let _writer = self.begin();
        let changed = self.selected_product.get() != product;
        self.selected_product.set(product);
        if changed {
            self.selected_source.set(None);
            self.selected_targets.set(Vec::new());
        }
        self.persist();
        changed
    }

    /// 设置所选源服务，并总是清除所选目标。
    pub fn set_selected_source(&self, source: Option<SourceService>) {
        let _writer = self.begin();
        self.selected_source.set(source);
        self.selected_targets.set(Vec::new());
        self.persist();
    }

    pub fn set_selected_targets(&self, targets: Vec<TargetSummary>) {
        let _writer = self.begin();
        self.selected_targets.set(targets);
        self.persist();
    }

    // ------------------------------------------------------------------
    // 映射
    // ------------------------------------------------------------------

    /// 追加映射；唯一键已存在时不追加也不写快照，返回 `false`。
    pub fn add_mapping(&self, mapping: PortMapping) -> bool {
        self.add_mappings(vec![mapping]) == 1
    }

    /// 批量追加映射，逐条去重，返回新增条数。
    pub fn add_mappings(&self, mappings: Vec<PortMapping>) -> usize {
        let _writer = self.begin();
        let mut current = self.mappings.get();
        let merge = registry::merge(&current, mappings);
        record_mappings_duplicate(merge.duplicates as u64);
        let added = merge.accepted.len();
        if added == 0 {
            debug!(target: "portmap.state", duplicates = merge.duplicates, "mappings_unchanged");
            return 0;
        }
        current.extend(merge.accepted);
        self.mappings.set(current);
        self.refresh_counts();
        record_mappings_added(added as u64);
        info!(
            target: "portmap.state",
            added,
            duplicates = merge.duplicates,
            "mappings_added"
        );
        self.persist();
        added
    }

    /// 按 id 删除映射；不存在时不做任何修改。
    pub fn remove_mapping(&self, mapping_id: &str) -> bool {
        let _writer = self.begin();
        let mut mappings = self.mappings.get();
        let before = mappings.len();
        mappings.retain(|mapping| mapping.id != mapping_id);
        if mappings.len() == before {
            return false;
        }
        self.mappings.set(mappings);
        self.refresh_counts();
        debug!(target: "portmap.state", mapping_id, "mapping_removed");
        self.persist();
        true
    }

    /// 改写单条映射的目标服务器名称。
    ///
    /// 映射不存在，或改写后与另一条映射唯一键冲突时不做修改，返回 `false`。
    pub fn update_mapping_target_server(
        &self,
        mapping_id: &str,
        target_server: impl Into<ServerRef>,
    ) -> bool {
        let target_server = target_server.into().into_name();
        let _writer = self.begin();
        let mut mappings = self.mappings.get();
        let Some(position) = mappings.iter().position(|mapping| mapping.id == mapping_id) else {
            return false;
        };
        let updated = mappings[position].with_target_server(target_server);
        let collides = mappings
            .iter()
            .enumerate()
            .any(|(index, mapping)| index != position && mapping.key() == updated.key());
        if collides {
            warn!(
                target: "portmap.state",
                mapping_id,
                target_server = %updated.target_server,
                "mapping_target_collides"
            );
            return false;
        }
        mappings[position] = updated;
        self.mappings.set(mappings);
        self.refresh_counts();
        self.persist();
        true
    }

    /// 导出全部映射（JSON 数组）。
    pub fn export_mappings(&self) -> Result<String, StateError> {
        serde_json::to_string(&self.mappings.get())
            .map_err(|err| StateError::Serialize(err.to_string()))
    }

    /// 导入映射；解析成功时整体替换映射列表，失败时不做任何修改。
    pub fn import_mappings(&self, payload: &str) -> bool {
        self.try_import_mappings(payload).is_ok()
    }

    /// 同 [`Self::import_mappings`]，返回导入明细或解析错误。
    pub fn try_import_mappings(&self, payload: &str) -> Result<ImportReport, StateError> {
        let parsed: Vec<PortMapping> = serde_json::from_str(payload).map_err(|err| {
            warn!(target: "portmap.state", error = %err, "mappings_import_failed");
            StateError::Import(err.to_string())
        })?;
        let total = parsed.len();
        let merge = registry::dedupe(parsed);
        let imported = merge.accepted.len();
        let _writer = self.begin();
        self.mappings.set(merge.accepted);
        self.refresh_counts();
        info!(
            target: "portmap.state",
            imported,
            duplicates = merge.duplicates,
            "mappings_imported"
        );
        self.persist();
        Ok(ImportReport { imported, total })
    }

    // ------------------------------------------------------------------
    // 生命周期
    // ------------------------------------------------------------------

    /// 重置全部切片并删除持久化记录。
    pub fn clear_state(&self) {
        let _writer = self.begin();
        self.persistence.clear();
        self.source_server.set(None);
        self.target_server.set(None);
        self.last_modified_server.set(None);
        self.servers.set(Vec::new());
        self.selected_product.set(None);
        self.selected_source.set(None);
        self.selected_targets.set(Vec::new());
        self.mappings.set(Vec::new());
        info!(target: "portmap.state", "state_cleared");
    }

    /// 断开全部切片的订阅者。
    pub fn teardown(&self) {
        let _writer = self.begin();
        self.source_server.detach_all();
        self.target_server.detach_all();
        self.last_modified_server.detach_all();
        self.servers.detach_all();
        self.selected_product.detach_all();
        self.selected_source.detach_all();
        self.selected_targets.detach_all();
        self.mappings.detach_all();
        debug!(target: "portmap.state", "store_teardown");
    }

    // ------------------------------------------------------------------
    // 内部
    // ------------------------------------------------------------------

    fn begin(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            source_server: self.source_server.get(),
            target_server: self.target_server.get(),
            last_modified_server: self.last_modified_server.get(),
            servers: self.servers.get(),
            selected_product: self.selected_product.get(),
            selected_source: self.selected_source.get(),
            selected_targets: self.selected_targets.get(),
            mappings: self.mappings.get(),
        }
    }

    fn persist(&self) {
        self.persistence.save(&self.snapshot());
    }

    fn listed(&self, server_id: i64) -> Option<Server> {
        self.servers
            .get()
            .into_iter()
            .find(|server| server.id == server_id)
    }

    fn synced(&self, server: Option<Server>) -> Option<Server> {
        registry::sync_server(server, &self.servers.get(), &self.mappings.get())
    }

    fn add_server_locked(&self, server: Server) -> bool {
        let mut servers = self.servers.get();
        if servers.iter().any(|item| item.id == server.id) {
            warn!(target: "portmap.state", server_id = server.id, "server_id_exists");
            return false;
        }
        info!(target: "portmap.state", server_id = server.id, server_name = %server.name, "server_added");
        servers.push(server);
        self.servers.set(servers);
        self.refresh_counts();
        true
    }

    fn update_server_locked(&self, server: Server) -> bool {
        let mut servers = self.servers.get();
        let Some(position) = servers.iter().position(|item| item.id == server.id) else {
            debug!(target: "portmap.state", server_id = server.id, "update_server_not_found");
            return false;
        };
        let old_name = servers[position].name.clone();
        servers[position] = server.clone();
        self.servers.set(servers);

        if old_name != server.name {
            let mappings = self.mappings.get();
            let renamed: Vec<PortMapping> = mappings
                .iter()
                .map(|mapping| {
                    mapping
                        .with_server_renamed(&old_name, &server.name)
                        .unwrap_or_else(|| mapping.clone())
                })
                .collect();
            if renamed != mappings {
                let merge = registry::dedupe(renamed);
                if merge.duplicates > 0 {
                    warn!(
                        target: "portmap.state",
                        server_id = server.id,
                        duplicates = merge.duplicates,
                        "rename_merged_mappings"
                    );
                }
                self.mappings.set(merge.accepted);
            }
            info!(
                target: "portmap.state",
                server_id = server.id,
                old_name = %old_name,
                new_name = %server.name,
                "server_renamed"
            );
        }
        self.refresh_counts();
        true
    }

    /// 重算计数，并让三个单服务器切片与列表保持一致。
    fn refresh_counts(&self) {
        let mappings = self.mappings.get();
        let servers = registry::with_counts(&self.servers.get(), &mappings);
        self.servers.set_if_changed(servers.clone());
        for slice in [
            &self.source_server,
            &self.target_server,
            &self.last_modified_server,
        ] {
            slice.set_if_changed(registry::sync_server(slice.get(), &servers, &mappings));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portmap_storage::InMemorySessionStore;
    use std::sync::Arc;

    fn store() -> ConfigurationStore {
        ConfigurationStore::open(SnapshotPersistence::with_default_key(Arc::new(
            InMemorySessionStore::new(),
        )))
    }

    #[test]
    fn restored_counts_are_recomputed() {
        let snapshot = StateSnapshot {
            servers: vec![Server::new(1, "A", "L").with_total_mapped_ports(9)],
            ..StateSnapshot::default()
        };
        let persistence =
            SnapshotPersistence::with_default_key(Arc::new(InMemorySessionStore::new()));
        let store = ConfigurationStore::from_snapshot(persistence, snapshot);
        assert_eq!(store.servers().get()[0].total_mapped_ports, 0);
    }

    #[test]
    fn restored_duplicates_are_dropped() {
        let mapping = |id: &str| PortMapping {
            id: id.to_string(),
            source_server: "A".to_string(),
            source_server_id: "s1".to_string(),
            target_server: "B".to_string(),
            product: "App".to_string(),
            protocol: "TCP".to_string(),
            port: "443".to_string(),
            section: "web".to_string(),
            description: String::new(),
        };
        let snapshot = StateSnapshot {
            servers: vec![
                Server::new(1, "A", "L1"),
                Server::new(2, "B", "L2"),
                Server::new(1, "A copy", "L3"),
            ],
            mappings: vec![mapping("m1"), mapping("m2")],
            ..StateSnapshot::default()
        };
        let persistence =
            SnapshotPersistence::with_default_key(Arc::new(InMemorySessionStore::new()));
        let store = ConfigurationStore::from_snapshot(persistence, snapshot);

        let servers = store.servers().get();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].name, "A");
        assert_eq!(servers[0].total_mapped_ports, 1);
        assert_eq!(servers[1].total_mapped_ports, 1);
        let mappings = store.mappings().get();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].id, "m1");
    }

    #[test]
    fn unknown_server_edit_is_reported() {
        let store = store();
        let err = store
            .save_server(&ServerDraft::editing(42, "Edge", "Rack"))
            .unwrap_err();
        assert!(matches!(err, StateError::UnknownServer(42)));
    }
}
