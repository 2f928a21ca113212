use std::sync::Arc;
use std::time::Duration;

use crate::cache::keys::{refresh_lock_key, snapshot_artifacts_pattern, snapshot_key};
use crate::cache::models::CachedSnapshot;
use crate::cache::store::CacheStore;
use crate::error::CacheError;
use crate::stats::AggregateSnapshot;

/// 统计快照缓存操作
#[derive(Clone)]
pub struct SnapshotCacheOperations {
    store: Arc<dyn CacheStore>,
}

impl SnapshotCacheOperations {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// 读取快照，内容损坏或不属于该用户时按未命中处理
    pub async fn get_snapshot(&self, user_id: &str) -> Result<Option<AggregateSnapshot>, CacheError> {
        let key = snapshot_key(user_id);
        let Some(json) = self.store.get(&key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<CachedSnapshot>(&json) {
            Ok(cached) if cached.user_id == user_id => Ok(Some(cached.snapshot)),
            Ok(cached) => {
                tracing::warn!(
                    "snapshot key {} holds data for user {}, ignoring",
                    key,
                    cached.user_id
                );
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("discarding undecodable snapshot at {}: {}", key, e);
                Ok(None)
            }
        }
    }

    /// 整值写入快照
    pub async fn put_snapshot(
        &self,
        user_id: &str,
        snapshot: &AggregateSnapshot,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let cached = CachedSnapshot::new(user_id, snapshot.clone(), ttl.as_secs());
        let json = serde_json::to_string(&cached)?;
        self.store.set_ex(&snapshot_key(user_id), &json, ttl).await
    }

    /// 尝试获取刷新锁
    pub async fn try_acquire_refresh_lock(&self, user_id: &str, ttl: Duration) -> Result<bool, CacheError> {
        let marker = chrono::Utc::now().timestamp_millis().to_string();
        self.store
            .set_nx_ex(&refresh_lock_key(user_id), &marker, ttl)
            .await
    }

    pub async fn release_refresh_lock(&self, user_id: &str) -> Result<(), CacheError> {
        self.store.del(&[refresh_lock_key(user_id)]).await?;
        Ok(())
    }

    /// 删除用户的快照以及所有派生缓存
    pub async fn invalidate_user(&self, user_id: &str) -> Result<u64, CacheError> {
        let removed = self.store.del(&[snapshot_key(user_id)]).await?;
        let derived = self
            .store
            .del_pattern(&snapshot_artifacts_pattern(user_id))
            .await?;
        Ok(removed + derived)
    }
}
