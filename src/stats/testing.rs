use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{PlatformName, PlatformStats};
use crate::cache::{CacheStore, MemoryCacheStore};
use crate::error::{CacheError, FetchError};
use crate::fetchers::SourceFetcher;

#[derive(Clone)]
pub(crate) enum Script {
    Succeed { solved: u64, rating: u64 },
    Fail,
    Hang,
    Panic,
}

impl Script {
    pub(crate) fn succeed(solved: u64, rating: u64) -> Self {
        Script::Succeed { solved, rating }
    }
}

/// 按脚本返回结果并记录调用次数的抓取器
pub(crate) struct ScriptedFetcher {
    platform: PlatformName,
    script: Script,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub(crate) fn new(platform: PlatformName, script: Script) -> Arc<Self> {
        Self::with_delay(platform, script, Duration::ZERO)
    }

    pub(crate) fn with_delay(platform: PlatformName, script: Script, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            platform,
            script,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn into_dyn(self: Arc<Self>) -> Arc<dyn SourceFetcher> {
        self
    }
}

#[async_trait]
impl SourceFetcher for ScriptedFetcher {
    fn platform(&self) -> PlatformName {
        self.platform
    }

    async fn fetch(&self, username: &str) -> Result<PlatformStats, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.script {
            Script::Succeed { solved, rating } => Ok(PlatformStats {
                username: username.to_string(),
                profile: None,
                solved: *solved,
                rating: *rating,
                rank: None,
                contests: 1,
                fetched_ok: true,
            }),
            Script::Fail => Err(FetchError::NotFound),
            Script::Hang => {
                std::future::pending::<()>().await;
                Err(FetchError::Timeout)
            }
            Script::Panic => panic!("scripted fetcher panic"),
        }
    }
}

/// 所有操作都报错的缓存，模拟 Redis 宕机
pub(crate) struct FailingStore;

fn unavailable() -> CacheError {
    CacheError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection refused",
    )))
}

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(unavailable())
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(unavailable())
    }

    async fn set_nx_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<bool, CacheError> {
        Err(unavailable())
    }

    async fn del(&self, _keys: &[String]) -> Result<u64, CacheError> {
        Err(unavailable())
    }

    async fn del_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Err(unavailable())
    }
}

/// 加锁很慢的进程内缓存，其它操作照常
pub(crate) struct SlowLockStore {
    inner: MemoryCacheStore,
    lock_delay: Duration,
}

impl SlowLockStore {
    pub(crate) fn new(lock_delay: Duration) -> Self {
        Self {
            inner: MemoryCacheStore::new(),
            lock_delay,
        }
    }
}

#[async_trait]
impl CacheStore for SlowLockStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set_ex(key, value, ttl).await
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError> {
        tokio::time::sleep(self.lock_delay).await;
        self.inner.set_nx_ex(key, value, ttl).await
    }

    async fn del(&self, keys: &[String]) -> Result<u64, CacheError> {
        self.inner.del(keys).await
    }

    async fn del_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        self.inner.del_pattern(pattern).await
    }
}
