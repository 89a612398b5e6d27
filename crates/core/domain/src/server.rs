//! 服务器模型与表单校验。

use serde::{Deserialize, Serialize};

/// 服务器名称最小长度（去除首尾空格后）。
pub const SERVER_NAME_MIN_LEN: usize = 3;

/// 服务器。
///
/// `total_mapped_ports` 为派生值，只由状态仓库重算，不接受外部直接设置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub total_mapped_ports: u32,
}

impl Server {
    pub fn new(id: i64, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            location: location.into(),
            total_mapped_ports: 0,
        }
    }

    /// 返回带新计数的副本。
    pub fn with_total_mapped_ports(&self, total_mapped_ports: u32) -> Self {
        Self {
            total_mapped_ports,
            ..self.clone()
        }
    }

    /// 返回更新名称与位置后的副本（计数保留，由仓库随后重算）。
    pub fn with_details(&self, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            ..self.clone()
        }
    }
}

/// 新增/编辑服务器的表单输入。
///
/// `id` 为空表示新增，否则表示编辑已有服务器。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDraft {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
}

/// 单个字段的校验失败。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// 表单校验失败（包含全部失败字段）。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid server: {}", describe(.fields))]
pub struct ServerDraftError {
    pub fields: Vec<FieldError>,
}

fn describe(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|item| format!("{}: {}", item.field, item.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ServerDraft {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            location: location.into(),
        }
    }

    pub fn editing(id: i64, name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            location: location.into(),
        }
    }

    /// 校验并返回去除首尾空格后的表单。
    pub fn validate(&self) -> Result<ServerDraft, ServerDraftError> {
        let name = self.name.trim();
        let location = self.location.trim();
        let mut fields = Vec::new();
        if name.is_empty() {
            fields.push(FieldError {
                field: "serverName",
                message: "This field is required".to_string(),
            });
        } else if name.chars().count() < SERVER_NAME_MIN_LEN {
            fields.push(FieldError {
                field: "serverName",
                message: format!("Must be at least {SERVER_NAME_MIN_LEN} characters"),
            });
        }
        if location.is_empty() {
            fields.push(FieldError {
                field: "serverLocation",
                message: "This field is required".to_string(),
            });
        }
        if !fields.is_empty() {
            return Err(ServerDraftError { fields });
        }
        Ok(ServerDraft {
            id: self.id,
            name: name.to_string(),
            location: location.to_string(),
        })
    }
}
