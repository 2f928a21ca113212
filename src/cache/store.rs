use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client as RedisClient};
use tokio::time::Instant;

use crate::error::CacheError;

/// 缓存存储抽象，只暴露原子操作，跨请求的协调全部基于这些操作完成
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// 整值覆盖写入并设置过期时间
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// 键不存在时写入，返回是否写入成功
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError>;

    async fn del(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// 按 glob 模式批量删除，返回删除数量
    async fn del_pattern(&self, pattern: &str) -> Result<u64, CacheError>;
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// Redis 实现
///
/// 每个操作（含建立连接）都有超时，Redis 挂起不响应时按不可用处理。
#[derive(Clone)]
pub struct RedisCacheStore {
    redis_client: Arc<RedisClient>,
    timeout: Duration,
}

impl RedisCacheStore {
    pub fn new(redis_client: Arc<RedisClient>, timeout: Duration) -> Self {
        Self {
            redis_client,
            timeout,
        }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))?
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        Ok(self.redis_client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let value: Option<String> = conn.get(key).await?;
            Ok::<_, CacheError>(value)
        })
        .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
            Ok::<_, CacheError>(())
        })
        .await
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;

            // SET key value NX EX ttl，键已存在时返回 nil
            let reply: Option<String> = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("NX")
                .arg("EX")
                .arg(ttl_secs(ttl))
                .query_async(&mut conn)
                .await?;

            Ok::<_, CacheError>(reply.is_some())
        })
        .await
    }

    async fn del(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.bounded(async {
            let mut conn = self.connection().await?;
            let removed: u64 = conn.del(keys.to_vec()).await?;
            Ok::<_, CacheError>(removed)
        })
        .await
    }

    async fn del_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;

            // SCAN 分批遍历，不用 KEYS 阻塞整个实例
            let mut keys: Vec<String> = Vec::new();
            {
                let mut iter = conn.scan_match::<_, String>(pattern).await?;
                while let Some(key) = iter.next_item().await {
                    keys.push(key);
                }
            }
            if keys.is_empty() {
                return Ok(0);
            }

            let removed: u64 = conn.del(keys).await?;
            Ok::<_, CacheError>(removed)
        })
        .await
    }
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// 进程内实现，未配置 Redis 时使用，测试也用它
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, MemoryEntry>> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        entries
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries().get(key).map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries().insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut entries = self.entries();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn del(&self, keys: &[String]) -> Result<u64, CacheError> {
        let mut entries = self.entries();
        Ok(keys.iter().filter(|key| entries.remove(*key).is_some()).count() as u64)
    }

    async fn del_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !glob_match(pattern, key));
        Ok((before - entries.len()) as u64)
    }
}

/// Redis KEYS 风格的匹配，支持 `*`、`?` 和反斜杠转义
fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, k));
                p += 1;
                continue;
            }
            Some('?') => {
                p += 1;
                k += 1;
                continue;
            }
            Some('\\') if pattern.get(p + 1) == Some(&key[k]) => {
                p += 2;
                k += 1;
                continue;
            }
            Some(c) if *c != '\\' && *c == key[k] => {
                p += 1;
                k += 1;
                continue;
            }
            _ => {}
        }

        match backtrack {
            Some((star, matched)) => {
                p = star + 1;
                k = matched + 1;
                backtrack = Some((star, matched + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_like_redis_keys() {
        assert!(glob_match("stats:artifacts:u1:*", "stats:artifacts:u1:page:2"));
        assert!(glob_match("stats:artifacts:u1:*", "stats:artifacts:u1:"));
        assert!(!glob_match("stats:artifacts:u1:*", "stats:artifacts:u10:page:2"));
        assert!(!glob_match("stats:artifacts:u1:*", "stats:artifacts:u1"));
        assert!(glob_match("a?c", "abc"));
        assert!(glob_match("a\\*b:*", "a*b:x"));
        assert!(!glob_match("a\\*b:*", "axb:x"));
    }

    #[tokio::test]
    async fn set_if_absent_only_creates_once() {
        let store = MemoryCacheStore::new();
        let ttl = Duration::from_secs(60);

        assert!(store.set_nx_ex("lock", "1", ttl).await.unwrap());
        assert!(!store.set_nx_ex("lock", "2", ttl).await.unwrap());
        assert_eq!(store.get("lock").await.unwrap().as_deref(), Some("1"));

        store.del(&["lock".to_string()]).await.unwrap();
        assert!(store.set_nx_ex("lock", "3", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let store = MemoryCacheStore::new();
        store
            .set_nx_ex("lock", "1", Duration::from_millis(30))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(store.get("lock").await.unwrap(), None);
        assert!(store
            .set_nx_ex("lock", "2", Duration::from_secs(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn pattern_delete_leaves_other_users_alone() {
        let store = MemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        store.set_ex("stats:artifacts:u1:page:1", "a", ttl).await.unwrap();
        store.set_ex("stats:artifacts:u1:page:2", "b", ttl).await.unwrap();
        store.set_ex("stats:artifacts:u2:page:1", "c", ttl).await.unwrap();

        let removed = store.del_pattern("stats:artifacts:u1:*").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.get("stats:artifacts:u2:page:1").await.unwrap().is_some());
    }

    /// 接受连接但从不回复的假 Redis
    async fn silent_redis() -> (String, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("redis://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        (url, server)
    }

    #[tokio::test]
    async fn unresponsive_redis_times_out() {
        let (url, server) = silent_redis().await;
        let client = RedisClient::open(url).unwrap();
        let store = RedisCacheStore::new(Arc::new(client), Duration::from_millis(100));
        let ttl = Duration::from_secs(60);

        let started = std::time::Instant::now();
        assert!(matches!(store.get("k").await, Err(CacheError::Timeout(_))));
        assert!(matches!(store.set_ex("k", "v", ttl).await, Err(CacheError::Timeout(_))));
        assert!(matches!(store.set_nx_ex("k", "v", ttl).await, Err(CacheError::Timeout(_))));
        assert!(matches!(store.del(&["k".to_string()]).await, Err(CacheError::Timeout(_))));
        assert!(matches!(store.del_pattern("k:*").await, Err(CacheError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(3));

        server.abort();
    }
}
