// 缓存模块
// 包含缓存存储抽象、缓存数据结构和操作逻辑

pub mod keys;
pub mod models;
pub mod operations;
pub mod store;

pub use models::CachedSnapshot;
pub use operations::SnapshotCacheOperations;
pub use store::{CacheStore, MemoryCacheStore, RedisCacheStore};
