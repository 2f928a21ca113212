use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;

use super::{FetcherHandle, RawPlatformResponse, SourceFetcher, capture_number, page_text};
use crate::error::FetchError;
use crate::stats::{PlatformName, PlatformStats};

const CODECHEF_PROFILE: &str = "https://www.codechef.com/users";

static RATING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="rating-number"[^>]*>\s*(\d+)"#).expect("valid regex")
});
static TOTAL_SOLVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Total Problems Solved:\s*(\d+)").expect("valid regex"));
static FULLY_SOLVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Fully Solved\s*\((\d+)\)").expect("valid regex"));

/// CodeChef 个人主页
pub struct CodeChefFetcher {
    handle: Arc<FetcherHandle>,
    base_url: String,
}

impl CodeChefFetcher {
    pub fn new(handle: Arc<FetcherHandle>) -> Self {
        Self {
            handle,
            base_url: CODECHEF_PROFILE.to_string(),
        }
    }
}

pub fn parse_profile(html: &str) -> Result<RawPlatformResponse, FetchError> {
    let rating = capture_number(&RATING_RE, html);
    let text = page_text(html);
    let solved = capture_number(&TOTAL_SOLVED_RE, &text)
        .or_else(|| capture_number(&FULLY_SOLVED_RE, &text));

    if rating.is_none() && solved.is_none() {
        return Err(FetchError::Malformed("no profile stats on page".into()));
    }

    Ok(RawPlatformResponse::CodeChef { rating, solved })
}

#[async_trait]
impl SourceFetcher for CodeChefFetcher {
    fn platform(&self) -> PlatformName {
        PlatformName::CodeChef
    }

    async fn fetch(&self, username: &str) -> Result<PlatformStats, FetchError> {
        let client = self.handle.client().await?;
        let response = client
            .get(format!("{}/{}", self.base_url, username))
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        let html = response.error_for_status()?.text().await?;

        Ok(parse_profile(&html)?.into_stats(username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rating_and_total_solved() {
        let html = r#"<div class="rating-header"><div class="rating-number">1876</div></div>
            <section><h3>Total Problems Solved: 312</h3></section>"#;

        let stats = parse_profile(html).unwrap().into_stats("bob");
        assert_eq!(stats.rating, 1876);
        assert_eq!(stats.solved, 312);
    }

    #[test]
    fn falls_back_to_fully_solved() {
        let html = r#"<h5>Fully Solved (45)</h5>"#;
        assert_eq!(
            parse_profile(html).unwrap(),
            RawPlatformResponse::CodeChef {
                rating: None,
                solved: Some(45),
            }
        );
    }

    #[test]
    fn page_without_stats_is_malformed() {
        assert!(matches!(
            parse_profile("<html><body>Just a moment...</body></html>"),
            Err(FetchError::Malformed(_))
        ));
    }
}
