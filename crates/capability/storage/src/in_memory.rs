//! 会话存储内存实现
//!
//! 用于单进程运行、单元测试和集成测试。

use crate::error::StorageError;
use crate::traits::SessionStore;
use std::collections::HashMap;
use std::sync::RwLock;

/// 会话存储内存实现
///
/// 使用 RwLock + HashMap 提供线程安全的内存存储。
pub struct InMemorySessionStore {
    items: RwLock<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    /// 以已有记录初始化（用于模拟上一次会话遗留的数据）
    pub fn with_item(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut items = HashMap::new();
        items.insert(key.into(), value.into());
        Self {
            items: RwLock::new(items),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self
            .items
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self
            .items
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self
            .items
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        items.remove(key);
        Ok(())
    }
}
