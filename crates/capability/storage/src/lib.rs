//! # Portmap Storage 模块
//!
//! 本模块提供会话级快照存储：配置状态在每次变更后整体写入一条记录，
//! 启动时恢复一次。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：同步的键值存储能力接口 `SessionStore`
//! 2. **错误处理层** (`error.rs`)：统一的存储错误类型
//! 3. **实现层**：
//!    - `in_memory`：进程内存实现（默认，也用于测试）
//!    - `redis`：Redis 单键记录，带会话 TTL
//!    - `noop`：无交互环境下的空实现
//! 4. **快照层** (`snapshot.rs`)：快照序列化、按字段恢复、尽力而为的保存
//!
//! ## 设计约束
//!
//! - 存储实现在构造时选定（见 [`session_store_for`]），调用方不做环境分支
//! - 读写错误只记录日志：读失败视为没有已保存状态，写失败视为跳过本次保存
//! - 恢复只合并记录中存在的字段，残缺或损坏的记录不会导致启动失败
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use portmap_storage::{InMemorySessionStore, SnapshotPersistence};
//! use std::sync::Arc;
//!
//! let persistence = SnapshotPersistence::with_default_key(Arc::new(InMemorySessionStore::new()));
//! let restored = persistence.load().into_snapshot();
//! persistence.save(&restored);
//! ```

pub mod error;
pub mod in_memory;
pub mod noop;
pub mod redis;
pub mod snapshot;
pub mod traits;

pub use error::*;
pub use in_memory::InMemorySessionStore;
pub use noop::NoopSessionStore;
pub use self::redis::RedisSessionStore;
pub use snapshot::*;
pub use traits::*;

use std::sync::Arc;

/// 会话存储后端类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStoreKind {
    Memory,
    Redis,
    Noop,
}

/// 按后端类型构造会话存储。
pub fn session_store_for(
    kind: SessionStoreKind,
    redis_url: &str,
    ttl_seconds: u64,
) -> Result<Arc<dyn SessionStore>, StorageError> {
    let store: Arc<dyn SessionStore> = match kind {
        SessionStoreKind::Memory => Arc::new(InMemorySessionStore::new()),
        SessionStoreKind::Redis => Arc::new(RedisSessionStore::connect(redis_url, ttl_seconds)?),
        SessionStoreKind::Noop => Arc::new(NoopSessionStore),
    };
    Ok(store)
}
