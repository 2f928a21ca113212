use crate::stats::{PlatformRank, PlatformStats};

/// 各平台解析后的原始数据，字段缺失或异常时映射为默认值
#[derive(Debug, Clone, PartialEq)]
pub enum RawPlatformResponse {
    LeetCode {
        solved: Option<i64>,
        rating: Option<f64>,
        global_ranking: Option<i64>,
        attended_contests: Option<i64>,
    },
    Codeforces {
        rating: Option<i64>,
        max_rank: Option<String>,
        solved_problems: usize,
        contests: Option<usize>,
    },
    CodeChef {
        rating: Option<u64>,
        solved: Option<u64>,
    },
    Gfg {
        solved: Option<u64>,
        coding_score: Option<u64>,
    },
}

fn count(value: Option<i64>) -> u64 {
    value.filter(|n| *n > 0).map(|n| n as u64).unwrap_or(0)
}

impl RawPlatformResponse {
    pub fn into_stats(self, username: &str) -> PlatformStats {
        let mut stats = PlatformStats {
            username: username.to_string(),
            profile: None,
            solved: 0,
            rating: 0,
            rank: None,
            contests: 0,
            fetched_ok: true,
        };

        match self {
            RawPlatformResponse::LeetCode {
                solved,
                rating,
                global_ranking,
                attended_contests,
            } => {
                stats.solved = count(solved);
                stats.rating = rating
                    .filter(|r| r.is_finite() && *r > 0.0)
                    .map(|r| r.floor() as u64)
                    .unwrap_or(0);
                stats.rank = global_ranking
                    .filter(|r| *r > 0)
                    .map(|r| PlatformRank::Position(r as u64));
                stats.contests = count(attended_contests);
            }
            RawPlatformResponse::Codeforces {
                rating,
                max_rank,
                solved_problems,
                contests,
            } => {
                stats.solved = solved_problems as u64;
                stats.rating = count(rating);
                stats.rank = max_rank
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .map(PlatformRank::Title);
                stats.contests = contests.unwrap_or(0) as u64;
            }
            RawPlatformResponse::CodeChef { rating, solved } => {
                stats.solved = solved.unwrap_or(0);
                stats.rating = rating.unwrap_or(0);
            }
            RawPlatformResponse::Gfg {
                solved,
                coding_score,
            } => {
                stats.solved = solved.unwrap_or(0);
                stats.rating = coding_score.unwrap_or(0);
            }
        }

        stats
    }
}
