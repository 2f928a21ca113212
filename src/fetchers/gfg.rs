use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;

use super::{FetcherHandle, RawPlatformResponse, SourceFetcher, capture_number, page_text};
use crate::error::FetchError;
use crate::stats::{PlatformName, PlatformStats};

const GFG_PROFILE: &str = "https://www.geeksforgeeks.org/profile";

static SOLVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Problems\s*Solved\s*:?\s*(\d+)").expect("valid regex"));
static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Coding\s*Score\s*:?\s*(\d+)").expect("valid regex"));

/// GeeksforGeeks 个人主页，只读服务端渲染的内容
pub struct GfgFetcher {
    handle: Arc<FetcherHandle>,
    base_url: String,
}

impl GfgFetcher {
    pub fn new(handle: Arc<FetcherHandle>) -> Self {
        Self {
            handle,
            base_url: GFG_PROFILE.to_string(),
        }
    }
}

pub fn parse_profile(html: &str) -> Result<RawPlatformResponse, FetchError> {
    let text = page_text(html);
    let solved = capture_number(&SOLVED_RE, &text);
    let coding_score = capture_number(&SCORE_RE, &text);

    if solved.is_none() && coding_score.is_none() {
        return Err(FetchError::Malformed("no profile stats on page".into()));
    }

    Ok(RawPlatformResponse::Gfg {
        solved,
        coding_score,
    })
}

#[async_trait]
impl SourceFetcher for GfgFetcher {
    fn platform(&self) -> PlatformName {
        PlatformName::Gfg
    }

    async fn fetch(&self, username: &str) -> Result<PlatformStats, FetchError> {
        let client = self.handle.client().await?;
        let response = client
            .get(format!("{}/{}/", self.base_url, username))
            .query(&[("tab", "activity")])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        let html = response.error_for_status()?.text().await?;

        Ok(parse_profile(&html)?.into_stats(username))
    }
}
