//! 稳定的 DTO 与 API 响应契约。
//!
//! - 外部查询服务的请求体：[`SourceRequest`]、[`PortRequest`]
//! - 本服务 HTTP 接口的统一响应封装与请求体

use domain::{OneOrMany, Product, ServerRef, SourceService, TargetSummary};
use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

// ============================================================================
// 外部查询服务请求体
// ============================================================================

/// 按产品查询源服务。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRequest {
    pub product_name: String,
}

/// 按源服务查询候选端口。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRequest {
    pub from_port: String,
    pub product_name: String,
    pub section: String,
}

impl PortRequest {
    /// 由所选源服务构造请求（产品名优先使用当前选中产品）。
    pub fn for_source(source: &SourceService, product_name: &str) -> Self {
        Self {
            from_port: source.from_port.clone(),
            product_name: product_name.to_string(),
            section: source.section.clone(),
        }
    }
}

// ============================================================================
// 本服务 HTTP 请求/响应体
// ============================================================================

/// 选择源/目标服务器（`serverId` 为空表示清除）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectServerRequest {
    #[serde(default)]
    pub server_id: Option<i64>,
}

/// 选择产品（为空表示清除）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectProductRequest {
    #[serde(default)]
    pub product: Option<Product>,
}

/// 选择源服务，兼容单个值或列表。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectSourceRequest {
    #[serde(default)]
    pub source: Option<OneOrMany<SourceService>>,
}

/// 选择目标，兼容单个值或列表。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectTargetsRequest {
    #[serde(default)]
    pub targets: Option<OneOrMany<TargetSummary>>,
}

/// 修改映射目标服务器（名称或完整服务器）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMappingTargetRequest {
    pub target_server: ServerRef,
}

/// 分配结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDto {
    pub added: usize,
    pub duplicates: usize,
    pub unresolved: usize,
}

/// 查询结果是否已生效（被更新的选择取代时为 false）。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupDto {
    pub applied: bool,
}

/// 导入结果：去重后写入的条数与载荷中的总条数。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDto {
    pub imported: usize,
    pub total: usize,
}

/// 级联选择的当前视图：阶段、查询结果与仓库中的选择。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionDto {
    pub stage: String,
    pub products: Vec<Product>,
    pub sources: Vec<SourceService>,
    pub targets: Vec<TargetSummary>,
    pub selected_product: Option<Product>,
    pub selected_source: Option<SourceService>,
    pub selected_targets: Vec<TargetSummary>,
}
