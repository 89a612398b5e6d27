//! 端口映射配置的领域模型。
//!
//! - 服务器：[`Server`] 与表单输入 [`ServerDraft`]
//! - 外部查询结果：[`Product`]、[`SourceService`]、[`CandidatePort`]、[`TargetSummary`]
//! - 映射：[`PortMapping`] 及其唯一键 [`MappingKey`]
//! - 选择控件载荷归一化：[`OneOrMany`]
//!
//! 所有类型的 JSON 字段均为 camelCase，与会话快照和外部查询服务保持一致。

pub mod catalog;
pub mod mapping;
pub mod selection;
pub mod server;

pub use catalog::{CandidatePort, Product, SourceService, TargetSummary};
pub use mapping::{MappingKey, PortMapping, ServerRef, UNKNOWN_SERVER};
pub use selection::OneOrMany;
pub use server::{FieldError, Server, ServerDraft, ServerDraftError};
