//! # Portmap Cascade 模块
//!
//! 级联选择流程：产品 → 源服务 → 候选端口 → 分配映射。
//!
//! - `controller`：[`SelectionCascade`]，驱动选择、发起查询并维护查询结果视图
//! - `sequence`：按查询类型发放递增序号，只应用最新发起的查询结果
//! - `assign`：把所选目标转换为映射并提交给状态仓库
//! - `error`：流程错误
//!
//! 阶段：`NoProduct → ProductChosen → SourceChosen → TargetsLoaded → Assigned`。
//! 切换源服务器会回到 `NoProduct`。查询失败不修改已加载的结果，也不推进阶段。

pub mod assign;
pub mod controller;
pub mod error;
pub mod sequence;

pub use assign::{AssignmentReport, build_mapping, new_mapping_id};
pub use controller::{CascadeStage, LookupOutcome, SelectionCascade};
pub use error::{AssignError, CascadeError, MissingSelection};
pub use sequence::{LookupKind, LookupSequence, Ticket};
