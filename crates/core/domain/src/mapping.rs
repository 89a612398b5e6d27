//! 端口映射与唯一键。

use crate::server::Server;
use serde::{Deserialize, Serialize};

/// 源/目标服务器缺失时写入映射的占位名称。
pub const UNKNOWN_SERVER: &str = "Unknown";

/// 已提交的端口映射。
///
/// 映射按名称引用服务器（`source_server` / `target_server`）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub id: String,
    pub source_server: String,
    #[serde(default)]
    pub source_server_id: String,
    pub target_server: String,
    pub product: String,
    #[serde(default)]
    pub protocol: String,
    pub port: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub description: String,
}

/// 映射唯一键：(sourceServer, targetServer, product, section, port)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingKey<'a> {
    pub source_server: &'a str,
    pub target_server: &'a str,
    pub product: &'a str,
    pub section: &'a str,
    pub port: &'a str,
}

impl PortMapping {
    pub fn key(&self) -> MappingKey<'_> {
        MappingKey {
            source_server: &self.source_server,
            target_server: &self.target_server,
            product: &self.product,
            section: &self.section,
            port: &self.port,
        }
    }

    /// 映射是否以源或目标身份引用了该服务器名称。
    pub fn references(&self, server_name: &str) -> bool {
        self.source_server == server_name || self.target_server == server_name
    }

    pub fn with_target_server(&self, target_server: impl Into<String>) -> Self {
        Self {
            target_server: target_server.into(),
            ..self.clone()
        }
    }

    /// 服务器改名后的副本；未引用旧名称时返回 `None`。
    pub fn with_server_renamed(&self, old_name: &str, new_name: &str) -> Option<Self> {
        if !self.references(old_name) {
            return None;
        }
        let mut renamed = self.clone();
        if renamed.source_server == old_name {
            renamed.source_server = new_name.to_string();
        }
        if renamed.target_server == old_name {
            renamed.target_server = new_name.to_string();
        }
        Some(renamed)
    }
}

/// 目标服务器引用：名称或完整服务器，统一解析为名称。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ServerRef {
    Server(Server),
    Name(String),
}

impl ServerRef {
    pub fn into_name(self) -> String {
        match self {
            ServerRef::Server(server) => server.name,
            ServerRef::Name(name) => name,
        }
    }
}

impl From<&str> for ServerRef {
    fn from(value: &str) -> Self {
        ServerRef::Name(value.to_string())
    }
}

impl From<String> for ServerRef {
    fn from(value: String) -> Self {
        ServerRef::Name(value)
    }
}

impl From<Server> for ServerRef {
    fn from(value: Server) -> Self {
        ServerRef::Server(value)
    }
}

impl From<&Server> for ServerRef {
    fn from(value: &Server) -> Self {
        ServerRef::Server(value.clone())
    }
}
