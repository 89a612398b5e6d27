//! 映射登记：唯一键去重与服务器映射端口计数。
//!
//! 这里只有纯函数，状态的读写由 [`crate::ConfigurationStore`] 负责。

use domain::{MappingKey, PortMapping, Server};
use std::collections::HashSet;

/// 合并结果。
#[derive(Debug, Default)]
pub struct Merge {
    pub accepted: Vec<PortMapping>,
    pub duplicates: usize,
}

/// 已有映射中是否存在相同唯一键。
pub fn contains_key(mappings: &[PortMapping], candidate: &PortMapping) -> bool {
    let key = candidate.key();
    mappings.iter().any(|mapping| mapping.key() == key)
}

/// 过滤出可追加的映射：与已有映射或本批次中更早的映射重复的都被丢弃。
pub fn merge(existing: &[PortMapping], incoming: Vec<PortMapping>) -> Merge {
    let mut seen: HashSet<MappingKey<'_>> = existing.iter().map(PortMapping::key).collect();
    let keep: Vec<bool> = incoming
        .iter()
        .map(|mapping| seen.insert(mapping.key()))
        .collect();
    drop(seen);
    let mut merge = Merge::default();
    for (mapping, keep) in incoming.into_iter().zip(keep) {
        if keep {
            merge.accepted.push(mapping);
        } else {
            merge.duplicates += 1;
        }
    }
    merge
}

/// 按唯一键去重（保留第一条）。
pub fn dedupe(mappings: Vec<PortMapping>) -> Merge {
    merge(&[], mappings)
}

/// 以源或目标身份引用该服务器名称的映射数。
pub fn mapped_port_count(mappings: &[PortMapping], server_name: &str) -> u32 {
    let count = mappings
        .iter()
        .filter(|mapping| mapping.references(server_name))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// 返回重算计数后的服务器列表。
pub fn with_counts(servers: &[Server], mappings: &[PortMapping]) -> Vec<Server> {
    servers
        .iter()
        .map(|server| server.with_total_mapped_ports(mapped_port_count(mappings, &server.name)))
        .collect()
}

/// 将单个服务器切片的值与列表对齐：列表中存在同 id 时取列表值，否则按名称重算计数。
pub fn sync_server(
    server: Option<Server>,
    servers: &[Server],
    mappings: &[PortMapping],
) -> Option<Server> {
    let server = server?;
    match servers.iter().find(|item| item.id == server.id) {
        Some(listed) => Some(listed.clone()),
        None => {
            let count = mapped_port_count(mappings, &server.name);
            Some(server.with_total_mapped_ports(count))
        }
    }
}

/// 按 id 去重服务器（保留第一条），返回去重后的列表与丢弃数。
pub fn dedupe_servers(servers: Vec<Server>) -> (Vec<Server>, usize) {
    let mut seen = HashSet::new();
    let mut dropped = 0;
    let mut unique = Vec::with_capacity(servers.len());
    for server in servers {
        if seen.insert(server.id) {
            unique.push(server);
        } else {
            dropped += 1;
        }
    }
    (unique, dropped)
}

/// 新服务器 id：现有最大 id + 1（列表为空时为 1）。
pub fn next_server_id(servers: &[Server]) -> i64 {
    servers.iter().map(|server| server.id).max().unwrap_or(0).max(0) + 1
}
