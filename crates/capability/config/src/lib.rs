//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 会话快照存储后端。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    /// 进程内存（默认）。
    Memory,
    /// Redis 单键记录，带会话 TTL。
    Redis,
    /// 无交互环境：读写均为空操作。
    None,
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub lookup_base_url: String,
    pub lookup_timeout_ms: u64,
    pub lookup_product_retries: u32,
    pub lookup_source_retries: u32,
    pub lookup_port_retries: u32,
    pub lookup_backoff_ms: u64,
    pub session_backend: SessionBackend,
    pub redis_url: String,
    pub session_ttl_seconds: u64,
    pub session_key: String,
    pub seed_servers: bool,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup_base_url = env::var("PORTMAP_LOOKUP_BASE_URL")
            .map_err(|_| ConfigError::Missing("PORTMAP_LOOKUP_BASE_URL".to_string()))?;
        let http_addr =
            env::var("PORTMAP_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let lookup_timeout_ms = read_u64_with_default("PORTMAP_LOOKUP_TIMEOUT_MS", 5000)?;
        let lookup_product_retries = read_u32_with_default("PORTMAP_LOOKUP_PRODUCT_RETRIES", 2)?;
        let lookup_source_retries = read_u32_with_default("PORTMAP_LOOKUP_SOURCE_RETRIES", 1)?;
        let lookup_port_retries = read_u32_with_default("PORTMAP_LOOKUP_PORT_RETRIES", 1)?;
        let lookup_backoff_ms = read_u64_with_default("PORTMAP_LOOKUP_BACKOFF_MS", 0)?;
        let session_backend = read_session_backend("PORTMAP_SESSION_BACKEND")?;
        let redis_url =
            env::var("PORTMAP_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let session_ttl_seconds = read_u64_with_default("PORTMAP_SESSION_TTL_SECONDS", 3600)?;
        let session_key = read_optional("PORTMAP_SESSION_KEY")
            .unwrap_or_else(|| "port-configuration-state".to_string());
        let seed_servers = read_bool_with_default("PORTMAP_SEED_SERVERS", false);

        Ok(Self {
            http_addr,
            lookup_base_url: lookup_base_url.trim_end_matches('/').to_string(),
            lookup_timeout_ms,
            lookup_product_retries,
            lookup_source_retries,
            lookup_port_retries,
            lookup_backoff_ms,
            session_backend,
            redis_url,
            session_ttl_seconds: session_ttl_seconds.max(1),
            session_key,
            seed_servers,
        })
    }
}

fn read_session_backend(key: &str) -> Result<SessionBackend, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(SessionBackend::Memory),
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "memory" => Ok(SessionBackend::Memory),
        "redis" => Ok(SessionBackend::Redis),
        "none" | "noop" => Ok(SessionBackend::None),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
