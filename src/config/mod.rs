use std::env;
use std::time::Duration;

/// 缓存后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl CacheBackend {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => CacheBackend::Memory,
            _ => CacheBackend::Redis,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub cache_backend: CacheBackend,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub rate_limit_window_ms: u64,
    pub rate_limit_default: i32,
    pub rate_limit_write_through: bool,
    pub request_timeout_ms: u64,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let cache_backend = env::var("CACHE_BACKEND")
            .map(|v| CacheBackend::parse(&v))
            .unwrap_or(CacheBackend::Redis);

        // 内存缓存不需要 Redis 地址
        let redis_url = match cache_backend {
            CacheBackend::Redis => env::var("REDIS_URL")?,
            CacheBackend::Memory => env::var("REDIS_URL").unwrap_or_default(),
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url,
            cache_backend,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: parse_or("SERVER_PORT", 3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api/v1".into()),
            rate_limit_window_ms: parse_or("RATE_LIMIT_WINDOW_MS", 10_000),
            rate_limit_default: parse_or("RATE_LIMIT_DEFAULT", 100),
            rate_limit_write_through: parse_or("RATE_LIMIT_WRITE_THROUGH", false),
            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 3_000),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10),
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
