//! 会话存储接口 Trait 定义
//!
//! 会话存储是一个按字符串键读写字符串值的能力接口，实现包括：
//! - InMemorySessionStore：进程内存
//! - RedisSessionStore：Redis 单键记录（带 TTL）
//! - NoopSessionStore：无交互环境，读写均为空操作
//!
//! 设计原则：
//! - 接口同步：状态仓库的变更方法全部同步执行
//! - 具体实现在构造时选定，调用方不做环境分支判断

use crate::error::StorageError;

/// 会话级键值存储
pub trait SessionStore: Send + Sync {
    /// 当前环境是否提供存储（空实现返回 false）
    fn is_available(&self) -> bool {
        true
    }

    /// 读取键值
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// 写入键值（覆盖已有值）
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// 删除键值（不存在时不报错）
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}
