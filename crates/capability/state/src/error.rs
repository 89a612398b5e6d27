//! 状态仓库错误。

use domain::ServerDraftError;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    InvalidServer(#[from] ServerDraftError),
    #[error("server not found: {0}")]
    UnknownServer(i64),
    #[error("serialize error: {0}")]
    Serialize(String),
    #[error("import error: {0}")]
    Import(String),
}
