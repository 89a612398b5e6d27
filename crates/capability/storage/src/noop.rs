//! 无交互环境下的会话存储：读返回空，写/删直接成功。

use crate::error::StorageError;
use crate::traits::SessionStore;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSessionStore;

impl SessionStore for NoopSessionStore {
    fn is_available(&self) -> bool {
        false
    }

    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}
