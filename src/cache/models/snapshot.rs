use serde::{Deserialize, Serialize};

use crate::stats::AggregateSnapshot;

/// 统计快照缓存数据模型
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CachedSnapshot {
    pub user_id: String,
    pub snapshot: AggregateSnapshot,
    pub expires_at: i64, // Unix timestamp
}

impl CachedSnapshot {
    pub fn new(user_id: &str, snapshot: AggregateSnapshot, ttl_secs: u64) -> Self {
        Self {
            user_id: user_id.to_string(),
            expires_at: chrono::Utc::now().timestamp() + ttl_secs as i64,
            snapshot,
        }
    }
}
