#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use statboard::{
    cache::{CacheStore, MemoryCacheStore, SnapshotCacheOperations},
    config::StatsSettings,
    error::FetchError,
    fetchers::SourceFetcher,
    stats::{
        AggregateSnapshot, Aggregator, MemoryIdentityStore, PlatformIdentity, PlatformName,
        PlatformStats, StatsCache,
    },
};

/// 固定返回结果并计数的抓取器
pub struct CountingFetcher {
    platform: PlatformName,
    solved: u64,
    rating: u64,
    delay: Duration,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(platform: PlatformName, solved: u64, rating: u64, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            platform,
            solved,
            rating,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for CountingFetcher {
    fn platform(&self) -> PlatformName {
        self.platform
    }

    async fn fetch(&self, username: &str) -> Result<PlatformStats, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(PlatformStats {
            username: username.to_string(),
            profile: None,
            solved: self.solved,
            rating: self.rating,
            rank: None,
            contests: 2,
            fetched_ok: true,
        })
    }
}

pub struct Harness {
    pub store: Arc<dyn CacheStore>,
    pub cache: SnapshotCacheOperations,
    pub identities: Arc<MemoryIdentityStore>,
    pub fetcher: Arc<CountingFetcher>,
    pub stats: Arc<StatsCache>,
}

impl Harness {
    /// u1 只配置了 LeetCode，抓取结果为 solved=120 rating=1500
    pub fn new(delay: Duration) -> Self {
        Self::with_settings(delay, StatsSettings::default())
    }

    pub fn with_settings(delay: Duration, settings: StatsSettings) -> Self {
        Self::with_store(Arc::new(MemoryCacheStore::new()), delay, settings)
    }

    pub fn with_store(store: Arc<dyn CacheStore>, delay: Duration, settings: StatsSettings) -> Self {
        let identities = Arc::new(MemoryIdentityStore::new());
        identities.insert_user(
            "u1",
            vec![
                PlatformIdentity::new(PlatformName::LeetCode, "alice"),
                PlatformIdentity::new(PlatformName::Gfg, ""),
            ],
        );
        let fetcher = CountingFetcher::new(PlatformName::LeetCode, 120, 1500, delay);
        let stats = Arc::new(StatsCache::new(
            store.clone(),
            Aggregator::new([fetcher.clone() as Arc<dyn SourceFetcher>], Duration::from_secs(5)),
            identities.clone(),
            settings,
        ));

        Self {
            cache: SnapshotCacheOperations::new(store.clone()),
            store,
            identities,
            fetcher,
            stats,
        }
    }

    /// 写入一个指定时间算出的快照
    pub async fn seed(&self, user_id: &str, solved: u64, computed_at: DateTime<Utc>) -> AggregateSnapshot {
        let snapshot = snapshot(solved, computed_at);
        self.cache
            .put_snapshot(user_id, &snapshot, Duration::from_secs(86400))
            .await
            .unwrap();
        snapshot
    }
}

pub fn snapshot(solved: u64, computed_at: DateTime<Utc>) -> AggregateSnapshot {
    let mut platforms = BTreeMap::new();
    platforms.insert(
        PlatformName::LeetCode,
        PlatformStats {
            username: "alice".into(),
            profile: None,
            solved,
            rating: 1400,
            rank: None,
            contests: 1,
            fetched_ok: true,
        },
    );
    AggregateSnapshot::from_platforms(platforms, computed_at)
}

/// 接受连接但从不回复的假 Redis，返回它的地址
pub async fn silent_redis() -> (String, tokio::task::JoinHandle<()>) {
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
