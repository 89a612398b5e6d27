//! Redis 会话存储实现
//!
//! 快照保存为单个字符串键，每次写入刷新 TTL，会话结束后自然过期。

use crate::error::StorageError;
use crate::traits::SessionStore;
use redis::Commands;

/// Redis 会话存储
pub struct RedisSessionStore {
    client: redis::Client,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    pub fn new(client: redis::Client, ttl_seconds: u64) -> Self {
        Self {
            client,
            ttl_seconds: ttl_seconds.max(1),
        }
    }

    pub fn connect(redis_url: &str, ttl_seconds: u64) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self::new(client, ttl_seconds))
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    fn connection(&self) -> Result<redis::Connection, StorageError> {
        Ok(self.client.get_connection()?)
    }
}

impl SessionStore for RedisSessionStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut connection = self.connection()?;
        let data: Option<String> = connection.get(key)?;
        Ok(data)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut connection = self.connection()?;
        connection.set_ex::<_, _, ()>(key, value, self.ttl_seconds)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut connection = self.connection()?;
        connection.del::<_, ()>(key)?;
        Ok(())
    }
}
