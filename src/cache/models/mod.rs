/// 缓存数据模型
pub mod snapshot;

pub use snapshot::CachedSnapshot;
