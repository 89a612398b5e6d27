//! 外部查询能力：产品 → 源服务 → 候选端口。
//!
//! - [`LookupSource`]：查询接口（async）
//! - [`HttpLookupClient`]：调用外部查询服务的 HTTP 实现
//! - [`InMemoryLookup`]：内存目录实现（测试与演示）
//! - [`RetryingLookup`]：按查询类型分别设置重试次数的装饰器

pub mod error;
pub mod http;
pub mod in_memory;
pub mod retry;
pub mod traits;

pub use error::LookupError;
pub use http::HttpLookupClient;
pub use in_memory::InMemoryLookup;
pub use retry::{RetryPolicy, RetryingLookup, with_retry};
pub use traits::LookupSource;
