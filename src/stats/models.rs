use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// 支持的刷题平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlatformName {
    LeetCode,
    Codeforces,
    CodeChef,
    #[serde(rename = "GFG")]
    Gfg,
}

impl PlatformName {
    pub const ALL: [PlatformName; 4] = [
        PlatformName::LeetCode,
        PlatformName::Codeforces,
        PlatformName::CodeChef,
        PlatformName::Gfg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformName::LeetCode => "LeetCode",
            PlatformName::Codeforces => "Codeforces",
            PlatformName::CodeChef => "CodeChef",
            PlatformName::Gfg => "GFG",
        }
    }
}

impl fmt::Display for PlatformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformName {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlatformName::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| IdentityError::UnknownPlatform(s.to_string()))
    }
}

/// 用户在某个平台上的账号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformIdentity {
    pub platform: PlatformName,
    pub username: String,
    pub profile: Option<String>,
}

impl PlatformIdentity {
    pub fn new(platform: PlatformName, username: impl Into<String>) -> Self {
        Self {
            platform,
            username: username.into(),
            profile: None,
        }
    }

    /// 用户名非空才算已配置
    pub fn is_configured(&self) -> bool {
        !self.username.trim().is_empty()
    }
}

/// 平台排名：LeetCode 是数字名次，Codeforces 是段位名称
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlatformRank {
    Position(u64),
    Title(String),
}

/// 单个平台的统计数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    pub solved: u64,
    pub rating: u64,
    pub rank: Option<PlatformRank>,
    pub contests: u64,
    pub fetched_ok: bool,
}

impl PlatformStats {
    /// 尚未抓取（或抓取失败）时的默认值
    pub fn unfetched(identity: &PlatformIdentity) -> Self {
        Self {
            username: identity.username.trim().to_string(),
            profile: identity.profile.clone(),
            solved: 0,
            rating: 0,
            rank: None,
            contests: 0,
            fetched_ok: false,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.username.is_empty()
    }

    /// 合并抓取结果，账号信息以用户配置为准
    pub fn apply(&mut self, fetched: PlatformStats) {
        self.solved = fetched.solved;
        self.rating = fetched.rating;
        self.rank = fetched.rank;
        self.contests = fetched.contests;
        self.fetched_ok = true;
    }
}

/// 聚合后的统计快照，缓存和接口返回的都是它
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub platforms: BTreeMap<PlatformName, PlatformStats>,
    pub total_solved: u64,
    pub total_contests: u64,
    pub best_rating: u64,
    pub platform_count: usize,
    pub computed_at: DateTime<Utc>,
}

impl AggregateSnapshot {
    /// 根据各平台数据计算汇总字段，只统计已配置用户名的平台
    pub fn from_platforms(
        platforms: BTreeMap<PlatformName, PlatformStats>,
        computed_at: DateTime<Utc>,
    ) -> Self {
        let configured = platforms.values().filter(|p| p.is_configured());

        let mut total_solved = 0u64;
        let mut total_contests = 0u64;
        let mut best_rating = 0u64;
        let mut platform_count = 0usize;
        for stats in configured {
            platform_count += 1;
            total_solved = total_solved.saturating_add(stats.solved);
            total_contests = total_contests.saturating_add(stats.contests);
            best_rating = best_rating.max(stats.rating);
        }

        Self {
            platforms,
            total_solved,
            total_contests,
            best_rating,
            platform_count,
            computed_at,
        }
    }

    /// 快照年龄超过阈值即视为过期；时钟回拨时按新鲜处理
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        match (now - self.computed_at).to_std() {
            Ok(age) => age > threshold,
            Err(_) => false,
        }
    }
}
