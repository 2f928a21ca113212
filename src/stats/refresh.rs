use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};

use super::{Aggregator, IdentityStore};
use crate::cache::SnapshotCacheOperations;
use crate::config::StatsSettings;
use crate::error::StatsError;

/// 一次刷新请求的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// 拿到锁，已在后台开始刷新
    Scheduled,
    /// 已有刷新在进行（或上一次刷新的锁还没过期）
    AlreadyRunning,
    /// 缓存不可用，无法加锁，本次跳过
    StoreUnavailable,
}

/// 过期快照的后台刷新
///
/// 通过缓存的 set-if-absent 加锁，同一用户同时最多只有一个刷新在跑。
/// 刷新任务由这里统一跟踪，结束后无论成功失败都会释放锁；
/// 进程崩溃导致的残留锁在 LOCK_TTL 后自动过期。
pub struct RefreshCoordinator {
    context: RefreshContext,
    tasks: Mutex<JoinSet<()>>,
}

/// 启动一次刷新需要的共享句柄
#[derive(Clone)]
struct RefreshContext {
    cache: SnapshotCacheOperations,
    aggregator: Arc<Aggregator>,
    identities: Arc<dyn IdentityStore>,
    settings: StatsSettings,
}

impl RefreshContext {
    /// 抢锁，成功时返回持有锁的刷新任务
    async fn try_start(&self, user_id: &str) -> Result<RefreshJob, RefreshOutcome> {
        match self
            .cache
            .try_acquire_refresh_lock(user_id, self.settings.lock_ttl())
            .await
        {
            Ok(true) => Ok(RefreshJob {
                lock: RefreshLockGuard::new(self.cache.clone(), user_id),
                cache: self.cache.clone(),
                aggregator: self.aggregator.clone(),
                identities: self.identities.clone(),
                user_id: user_id.to_string(),
                cache_ttl: self.settings.cache_ttl(),
            }),
            Ok(false) => {
                tracing::debug!("refresh for user {} already in flight, skipping", user_id);
                Err(RefreshOutcome::AlreadyRunning)
            }
            Err(e) => {
                tracing::warn!("cannot take refresh lock for user {}: {}", user_id, e);
                Err(RefreshOutcome::StoreUnavailable)
            }
        }
    }
}

impl RefreshCoordinator {
    pub fn new(
        cache: SnapshotCacheOperations,
        aggregator: Arc<Aggregator>,
        identities: Arc<dyn IdentityStore>,
        settings: StatsSettings,
    ) -> Self {
        Self {
            context: RefreshContext {
                cache,
                aggregator,
                identities,
                settings,
            },
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// 立即返回，抢锁和刷新都在后台任务里完成
    pub fn schedule(&self, user_id: &str) {
        let context = self.context.clone();
        let user_id = user_id.to_string();
        self.spawn(async move {
            if let Ok(job) = context.try_start(&user_id).await {
                job.run().await;
            }
        });
    }

    /// 等到抢锁有结果再返回，刷新本身仍在后台
    pub async fn maybe_refresh(&self, user_id: &str) -> RefreshOutcome {
        match self.context.try_start(user_id).await {
            Ok(job) => {
                self.spawn(job.run());
                RefreshOutcome::Scheduled
            }
            Err(outcome) => outcome,
        }
    }

    /// 当前仍在运行的刷新任务数
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.tasks();
        while let Some(finished) = tasks.try_join_next() {
            log_finished(finished);
        }
        tasks.len()
    }

    /// 等待所有已启动的刷新结束
    pub async fn drain(&self) {
        loop {
            let mut running = std::mem::take(&mut *self.tasks());
            if running.is_empty() {
                return;
            }
            while let Some(finished) = running.join_next().await {
                log_finished(finished);
            }
        }
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks();
        while let Some(finished) = tasks.try_join_next() {
            log_finished(finished);
        }
        tasks.spawn(task);
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn log_finished(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!("background refresh panicked: {}", e);
        } else {
            tracing::debug!("background refresh cancelled: {}", e);
        }
    }
}

struct RefreshJob {
    lock: RefreshLockGuard,
    cache: SnapshotCacheOperations,
    aggregator: Arc<Aggregator>,
    identities: Arc<dyn IdentityStore>,
    user_id: String,
    cache_ttl: Duration,
}

impl RefreshJob {
    async fn run(self) {
        tracing::info!("Background refresh started for user {}", self.user_id);

        match self.refresh().await {
            Ok(()) => tracing::info!("Background refresh finished for user {}", self.user_id),
            // 旧快照继续有效，等下一次刷新
            Err(e) => tracing::error!("Background refresh failed for user {}: {}", self.user_id, e),
        }

        self.lock.release().await;
    }

    async fn refresh(&self) -> Result<(), StatsError> {
        let identities = self
            .identities
            .load(&self.user_id)
            .await?
            .ok_or_else(|| StatsError::UserNotFound(self.user_id.clone()))?;

        let snapshot = self.aggregator.aggregate(&identities).await;
        self.cache
            .put_snapshot(&self.user_id, &snapshot, self.cache_ttl)
            .await?;
        Ok(())
    }
}

/// 刷新锁的释放守卫，任务 panic 或被取消时在 drop 里补删锁
struct RefreshLockGuard {
    cache: SnapshotCacheOperations,
    user_id: Option<String>,
}

impl RefreshLockGuard {
    fn new(cache: SnapshotCacheOperations, user_id: &str) -> Self {
        Self {
            cache,
            user_id: Some(user_id.to_string()),
        }
    }

    async fn release(mut self) {
        if let Some(user_id) = self.user_id.take() {
            release_lock(&self.cache, &user_id).await;
        }
    }
}

impl Drop for RefreshLockGuard {
    fn drop(&mut self) {
        let Some(user_id) = self.user_id.take() else {
            return;
        };
        let cache = self.cache.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { release_lock(&cache, &user_id).await });
            }
            Err(_) => {
                tracing::warn!("refresh lock for user {} left to expire", user_id);
            }
        }
    }
}

async fn release_lock(cache: &SnapshotCacheOperations, user_id: &str) {
    // 删除失败时锁会在 LOCK_TTL 后自动过期
    if let Err(e) = cache.release_refresh_lock(user_id).await {
        tracing::warn!("failed to release refresh lock for user {}: {}", user_id, e);
    }
}
