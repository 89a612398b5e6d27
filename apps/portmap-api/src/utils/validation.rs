//! 输入验证辅助函数
//!
//! - normalize_required：验证必填字段，去除空格并检查非空
//!
//! 失败返回 bad_request_error 响应。

use crate::utils::response::bad_request_error;
use axum::response::Response;

/// 验证必填字段，去除空格并检查非空
pub fn normalize_required(value: String, field: &str) -> Result<String, Response> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(bad_request_error(format!("{field} required")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn blank_value_is_rejected() {
        assert_eq!(normalize_required("  x ".to_string(), "name").ok().as_deref(), Some("x"));
        let response = normalize_required("   ".to_string(), "name").unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
