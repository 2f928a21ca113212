use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    /// 未配置时使用进程内缓存
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub fetch_timeout_secs: u64,
    /// 单次缓存操作（含建立连接）的超时
    pub cache_timeout_ms: u64,
    pub stats: StatsSettings,
}

/// 统计缓存的可调参数（秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct StatsSettings {
    pub refresh_threshold_secs: u64,
    pub cache_ttl_secs: u64,
    pub lock_ttl_secs: u64,
    pub aggregate_timeout_secs: u64,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            refresh_threshold_secs: 1800, // 30 分钟
            cache_ttl_secs: 86400,        // 24 小时
            lock_ttl_secs: 60,
            aggregate_timeout_secs: 45,
        }
    }
}

impl StatsSettings {
    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregate_timeout_secs)
    }
}

fn var_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().trim_end_matches('s').parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let defaults = StatsSettings::default();
        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.trim_end_matches('h').parse::<u64>().ok())
            .unwrap_or(24);

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiration_secs: jwt_expiration * 3600,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: var_or("SERVER_PORT", 4000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".into()),
            fetch_timeout_secs: var_or("FETCH_TIMEOUT", 10),
            cache_timeout_ms: var_or("CACHE_TIMEOUT_MS", 1000),
            stats: StatsSettings {
                refresh_threshold_secs: var_or(
                    "REFRESH_THRESHOLD",
                    defaults.refresh_threshold_secs,
                ),
                cache_ttl_secs: var_or("CACHE_TTL", defaults.cache_ttl_secs),
                lock_ttl_secs: var_or("LOCK_TTL", defaults.lock_ttl_secs),
                aggregate_timeout_secs: var_or(
                    "AGGREGATE_TIMEOUT",
                    defaults.aggregate_timeout_secs,
                ),
            },
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }
}
