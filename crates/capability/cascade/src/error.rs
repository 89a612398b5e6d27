//! 级联流程错误。

use portmap_lookup::LookupError;
use std::fmt;

/// 查询失败（重试耗尽后）。已加载的结果保持不变。
#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),
}

/// 分配前缺少的选择项。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSelection {
    TargetServer,
    Source,
    Targets,
}

impl fmt::Display for MissingSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MissingSelection::TargetServer => "target server",
            MissingSelection::Source => "source service",
            MissingSelection::Targets => "target ports",
        };
        f.write_str(label)
    }
}

/// 分配前置条件不满足；一次列出全部缺失项。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignError {
    #[error("missing selection: {}", join(.0))]
    MissingSelection(Vec<MissingSelection>),
}

fn join(items: &[MissingSelection]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
