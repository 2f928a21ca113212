use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};

use super::{FetcherHandle, RawPlatformResponse, SourceFetcher};
use crate::error::FetchError;
use crate::stats::{PlatformName, PlatformStats};

const CODEFORCES_API: &str = "https://codeforces.com/api";

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: String,
    comment: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    rating: Option<i64>,
    max_rank: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Submission {
    verdict: Option<String>,
    problem: Problem,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Problem {
    contest_id: Option<i64>,
    #[serde(default)]
    index: String,
    #[serde(default)]
    name: String,
}

/// 解析 Codeforces API 的统一外层结构，失败时 comment 里带原因
fn unwrap_envelope<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    let envelope: ApiEnvelope<T> =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    if envelope.status != "OK" {
        let comment = envelope.comment.unwrap_or_default();
        if comment.contains("not found") {
            return Err(FetchError::NotFound);
        }
        return Err(FetchError::Malformed(format!(
            "status {}: {}",
            envelope.status, comment
        )));
    }

    envelope
        .result
        .ok_or_else(|| FetchError::Malformed("missing result".into()))
}

pub fn parse_user_info(body: &str) -> Result<UserInfo, FetchError> {
    unwrap_envelope::<Vec<UserInfo>>(body)?
        .into_iter()
        .next()
        .ok_or(FetchError::NotFound)
}

/// 按题目去重统计通过数
pub fn count_solved(body: &str) -> Result<usize, FetchError> {
    let submissions: Vec<Submission> = unwrap_envelope(body)?;

    let solved: HashSet<(Option<i64>, String)> = submissions
        .into_iter()
        .filter(|s| s.verdict.as_deref() == Some("OK"))
        .map(|s| {
            let id = if s.problem.index.is_empty() {
                s.problem.name
            } else {
                s.problem.index
            };
            (s.problem.contest_id, id)
        })
        .collect();

    Ok(solved.len())
}

pub fn count_contests(body: &str) -> Result<usize, FetchError> {
    Ok(unwrap_envelope::<Vec<IgnoredAny>>(body)?.len())
}

/// Codeforces 公开 API
pub struct CodeforcesFetcher {
    handle: Arc<FetcherHandle>,
    base_url: String,
}

impl CodeforcesFetcher {
    pub fn new(handle: Arc<FetcherHandle>) -> Self {
        Self {
            handle,
            base_url: CODEFORCES_API.to_string(),
        }
    }

    async fn get(&self, method: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
        let client = self.handle.client().await?;
        // 失败时 Codeforces 也会返回带 comment 的 JSON，不按状态码判断
        let body = client
            .get(format!("{}/{}", self.base_url, method))
            .query(query)
            .send()
            .await?
            .text()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl SourceFetcher for CodeforcesFetcher {
    fn platform(&self) -> PlatformName {
        PlatformName::Codeforces
    }

    async fn fetch(&self, username: &str) -> Result<PlatformStats, FetchError> {
        let info = self.get("user.info", &[("handles", username)]).await?;
        let status = self.get("user.status", &[("handle", username)]).await;
        let rating = self.get("user.rating", &[("handle", username)]).await;

        assemble(username, &info, status, rating)
    }
}

/// 只有 user.info 失败才算整体失败，通过数和比赛场次拿不到时记为 0
fn assemble(
    username: &str,
    info: &str,
    status: Result<String, FetchError>,
    rating: Result<String, FetchError>,
) -> Result<PlatformStats, FetchError> {
    let info = parse_user_info(info)?;

    let solved_problems = match status.and_then(|body| count_solved(&body)) {
        Ok(solved) => solved,
        Err(e) => {
            tracing::warn!("codeforces submissions for {} unavailable: {}", username, e);
            0
        }
    };

    let contests = match rating.and_then(|body| count_contests(&body)) {
        Ok(contests) => Some(contests),
        Err(e) => {
            tracing::debug!("codeforces rating history for {} unavailable: {}", username, e);
            None
        }
    };

    Ok(RawPlatformResponse::Codeforces {
        rating: info.rating,
        max_rank: info.max_rank,
        solved_problems,
        contests,
    }
    .into_stats(username))
}
