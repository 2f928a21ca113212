use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{FetcherHandle, RawPlatformResponse, SourceFetcher};
use crate::error::FetchError;
use crate::stats::{PlatformName, PlatformStats};

const LEETCODE_GRAPHQL: &str = "https://leetcode.com/graphql";

const PROFILE_QUERY: &str = r#"
query getUserProfile($username: String!) {
  matchedUser(username: $username) {
    submitStatsGlobal {
      acSubmissionNum {
        count
      }
    }
  }
  userContestRanking(username: $username) {
    rating
    globalRanking
    attendedContestsCount
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ProfileData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileData {
    matched_user: Option<MatchedUser>,
    user_contest_ranking: Option<ContestRanking>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchedUser {
    submit_stats_global: Option<SubmitStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitStats {
    #[serde(default)]
    ac_submission_num: Vec<SubmissionCount>,
}

#[derive(Debug, Deserialize)]
struct SubmissionCount {
    count: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContestRanking {
    rating: Option<f64>,
    global_ranking: Option<i64>,
    attended_contests_count: Option<i64>,
}

/// LeetCode GraphQL 接口
pub struct LeetCodeFetcher {
    handle: Arc<FetcherHandle>,
    endpoint: String,
}

impl LeetCodeFetcher {
    pub fn new(handle: Arc<FetcherHandle>) -> Self {
        Self {
            handle,
            endpoint: LEETCODE_GRAPHQL.to_string(),
        }
    }
}

/// 第一项是所有难度的总数
pub fn parse_profile(body: &str) -> Result<RawPlatformResponse, FetchError> {
    let response: GraphQlResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    let data = response
        .data
        .ok_or_else(|| FetchError::Malformed("missing data".into()))?;
    let user = data.matched_user.ok_or(FetchError::NotFound)?;

    let solved = user
        .submit_stats_global
        .and_then(|s| s.ac_submission_num.into_iter().next())
        .and_then(|c| c.count);
    let contest = data.user_contest_ranking;

    Ok(RawPlatformResponse::LeetCode {
        solved,
        rating: contest.as_ref().and_then(|c| c.rating),
        global_ranking: contest.as_ref().and_then(|c| c.global_ranking),
        attended_contests: contest.as_ref().and_then(|c| c.attended_contests_count),
    })
}

#[async_trait]
impl SourceFetcher for LeetCodeFetcher {
    fn platform(&self) -> PlatformName {
        PlatformName::LeetCode
    }

    async fn fetch(&self, username: &str) -> Result<PlatformStats, FetchError> {
        let client = self.handle.client().await?;
        let body = client
            .post(&self.endpoint)
            .json(&json!({
                "query": PROFILE_QUERY,
                "variables": { "username": username },
            }))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_profile(&body)?.into_stats(username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_solved_and_contest_ranking() {
        let body = r#"{"data":{
            "matchedUser":{"submitStatsGlobal":{"acSubmissionNum":[{"count":120},{"count":50}]}},
            "userContestRanking":{"rating":1500.4,"globalRanking":20345,"attendedContestsCount":7}
        }}"#;

        let raw = parse_profile(body).unwrap();
        assert_eq!(
            raw,
            RawPlatformResponse::LeetCode {
                solved: Some(120),
                rating: Some(1500.4),
                global_ranking: Some(20345),
                attended_contests: Some(7),
            }
        );
    }

    #[test]
    fn missing_user_is_not_found() {
        let body = r#"{"data":{"matchedUser":null,"userContestRanking":null}}"#;
        assert!(matches!(parse_profile(body), Err(FetchError::NotFound)));
    }

    #[test]
    fn user_without_contests_still_parses() {
        let body = r#"{"data":{
            "matchedUser":{"submitStatsGlobal":{"acSubmissionNum":[{"count":3}]}},
            "userContestRanking":null
        }}"#;

        let stats = parse_profile(body).unwrap().into_stats("newbie");
        assert_eq!(stats.solved, 3);
        assert_eq!(stats.rating, 0);
        assert_eq!(stats.contests, 0);
    }
}
