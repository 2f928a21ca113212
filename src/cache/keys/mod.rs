/// 缓存键模块
pub mod stats_keys;

pub use stats_keys::{
    refresh_lock_key, snapshot_artifact_key, snapshot_artifacts_pattern, snapshot_key,
};
