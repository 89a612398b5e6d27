//! 查询错误。

/// 外部查询失败。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// 网络层错误（连接失败、超时等）。
    #[error("transport error: {0}")]
    Transport(String),
    /// 服务端返回非 2xx 状态。
    #[error("Error Code: {status}\nMessage: {message}")]
    Status { status: u16, message: String },
    /// 响应体无法解析。
    #[error("decode error: {0}")]
    Decode(String),
}

impl LookupError {
    /// 是否值得重试：网络错误与 5xx。
    pub fn is_transient(&self) -> bool {
        match self {
            LookupError::Transport(_) => true,
            LookupError::Status { status, .. } => *status >= 500,
            LookupError::Decode(_) => false,
        }
    }
}
