/// 统计快照缓存键前缀
const SNAPSHOT_PREFIX: &str = "stats:snapshot:";

/// 刷新锁缓存键前缀
const REFRESH_LOCK_PREFIX: &str = "stats:refreshlock:";

/// 派生缓存（分页等）键前缀，和快照分开，避免按模式删除时误删别的用户的快照
const ARTIFACTS_PREFIX: &str = "stats:artifacts:";

/// 生成统计快照缓存键
pub fn snapshot_key(user_id: &str) -> String {
    format!("{}{}", SNAPSHOT_PREFIX, user_id)
}

/// 生成刷新锁缓存键
pub fn refresh_lock_key(user_id: &str) -> String {
    format!("{}{}", REFRESH_LOCK_PREFIX, user_id)
}

/// 生成用户的派生缓存键
pub fn snapshot_artifact_key(user_id: &str, name: &str) -> String {
    format!("{}{}:{}", ARTIFACTS_PREFIX, encode_id(user_id), name)
}

/// 匹配用户所有派生缓存的模式，用户ID中的通配符会被转义
pub fn snapshot_artifacts_pattern(user_id: &str) -> String {
    format!("{}{}:*", ARTIFACTS_PREFIX, escape_glob(&encode_id(user_id)))
}

// 用户ID里的冒号会和分隔符混淆，派生键中统一编码
fn encode_id(user_id: &str) -> String {
    user_id.replace('%', "%25").replace(':', "%3A")
}

fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
