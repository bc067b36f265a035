//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 写缓冲配置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSettings {
    /// 关闭时所有写入走同步直写。
    pub enabled: bool,
    pub max_queue: usize,
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    /// drop / fallback / block（block 按 fallback 处理）
    pub on_overflow: String,
    pub shutdown_timeout_ms: u64,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_queue: 50_000,
            batch_size: 200,
            flush_interval_ms: 100,
            on_overflow: "fallback".to_string(),
            shutdown_timeout_ms: 5_000,
        }
    }
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    /// 未配置时使用内存存储。
    pub database_url: Option<String>,
    pub buffer: BufferSettings,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr =
            env::var("FEEDHUB_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let database_url = read_optional("FEEDHUB_DATABASE_URL");

        let defaults = BufferSettings::default();
        let buffer = BufferSettings {
            enabled: read_bool_with_default("FEEDHUB_BUFFER_ENABLED", defaults.enabled)?,
            max_queue: read_usize_with_default("FEEDHUB_BUFFER_MAX_QUEUE", defaults.max_queue)?,
            batch_size: read_usize_with_default("FEEDHUB_BUFFER_BATCH_SIZE", defaults.batch_size)?,
            flush_interval_ms: read_u64_with_default(
                "FEEDHUB_BUFFER_FLUSH_INTERVAL_MS",
                defaults.flush_interval_ms,
            )?,
            on_overflow: read_overflow_policy("FEEDHUB_BUFFER_ON_OVERFLOW", &defaults.on_overflow)?,
            shutdown_timeout_ms: read_u64_with_default(
                "FEEDHUB_BUFFER_SHUTDOWN_TIMEOUT_MS",
                defaults.shutdown_timeout_ms,
            )?,
        };
        if buffer.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "FEEDHUB_BUFFER_BATCH_SIZE".to_string(),
                "0".to_string(),
            ));
        }

        Ok(Self {
            http_addr,
            database_url,
            buffer,
        })
    }
}

fn read_overflow_policy(key: &str, default: &str) -> Result<String, ConfigError> {
    let value = match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_ascii_lowercase(),
        _ => return Ok(default.to_string()),
    };
    match value.as_str() {
        "drop" | "fallback" | "block" => Ok(value),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
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

fn read_usize_with_default(key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> Result<bool, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}
