use std::sync::Arc;

use chrono::Utc;

use super::{AggregateSnapshot, Aggregator, IdentityStore, RefreshCoordinator, RefreshOutcome};
use crate::cache::{CacheStore, SnapshotCacheOperations};
use crate::config::StatsSettings;
use crate::error::StatsError;

/// 统计缓存入口，接口层只和它打交道
///
/// 命中缓存时立即返回旧快照，过期则交给 [`RefreshCoordinator`] 在后台抢锁刷新；
/// 未命中时同步聚合并写回缓存。缓存不可用时按未命中处理，不向调用方报错。
pub struct StatsCache {
    cache: SnapshotCacheOperations,
    aggregator: Arc<Aggregator>,
    identities: Arc<dyn IdentityStore>,
    refresher: RefreshCoordinator,
    settings: StatsSettings,
}

impl StatsCache {
    pub fn new(
        store: Arc<dyn CacheStore>,
        aggregator: Aggregator,
        identities: Arc<dyn IdentityStore>,
        settings: StatsSettings,
    ) -> Self {
        let cache = SnapshotCacheOperations::new(store);
        let aggregator = Arc::new(aggregator);
        let refresher =
            RefreshCoordinator::new(cache.clone(), aggregator.clone(), identities.clone(), settings);

        Self {
            cache,
            aggregator,
            identities,
            refresher,
            settings,
        }
    }

    pub async fn get_stats(&self, user_id: &str) -> Result<AggregateSnapshot, StatsError> {
        match self.cache.get_snapshot(user_id).await {
            Ok(Some(snapshot)) => {
                if snapshot.is_stale(Utc::now(), self.settings.refresh_threshold()) {
                    tracing::debug!("stale snapshot for user {}, scheduling refresh", user_id);
                    self.refresher.schedule(user_id);
                }
                return Ok(snapshot);
            }
            Ok(None) => {
                tracing::debug!("stats cache miss for user {}", user_id);
            }
            Err(e) => {
                tracing::warn!("stats cache unavailable, aggregating directly: {}", e);
            }
        }

        self.aggregate_and_store(user_id).await
    }

    /// 删除用户的所有统计缓存，修改平台账号后必须调用
    pub async fn invalidate(&self, user_id: &str) {
        match self.cache.invalidate_user(user_id).await {
            Ok(removed) => {
                tracing::info!("Invalidated {} stats cache entries for user {}", removed, user_id)
            }
            Err(e) => tracing::warn!("failed to invalidate stats cache for user {}: {}", user_id, e),
        }
    }

    /// 不看缓存状态，直接触发一次后台刷新
    pub async fn request_refresh(&self, user_id: &str) -> RefreshOutcome {
        self.refresher.maybe_refresh(user_id).await
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    /// 等待后台刷新全部结束，进程退出前调用
    pub async fn shutdown(&self) {
        self.refresher.drain().await;
    }

    async fn aggregate_and_store(&self, user_id: &str) -> Result<AggregateSnapshot, StatsError> {
        let identities = self
            .identities
            .load(user_id)
            .await?
            .ok_or_else(|| StatsError::UserNotFound(user_id.to_string()))?;

        let snapshot = self.aggregator.aggregate(&identities).await;

        if let Err(e) = self
            .cache
            .put_snapshot(user_id, &snapshot, self.settings.cache_ttl())
            .await
        {
            tracing::warn!("failed to cache stats for user {}: {}", user_id, e);
        }

        Ok(snapshot)
    }
}
