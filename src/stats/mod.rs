// 刷题统计聚合
// 并发抓取各平台数据并汇总，结果放进缓存，过期后在后台单飞刷新

pub mod aggregator;
pub mod identity;
pub mod models;
pub mod refresh;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::Aggregator;
pub use identity::{IdentityStore, MemoryIdentityStore};
pub use models::{AggregateSnapshot, PlatformIdentity, PlatformName, PlatformRank, PlatformStats};
pub use refresh::{RefreshCoordinator, RefreshOutcome};
pub use service::StatsCache;
