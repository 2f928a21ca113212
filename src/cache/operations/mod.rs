/// 缓存操作
pub mod snapshot;

pub use snapshot::SnapshotCacheOperations;
