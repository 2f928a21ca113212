// 各平台数据抓取
// 每个平台一个抓取器，先解析成平台自己的原始结构，再统一映射为 PlatformStats

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::error::FetchError;
use crate::stats::{PlatformName, PlatformStats};

pub mod codechef;
pub mod codeforces;
pub mod gfg;
pub mod handle;
pub mod leetcode;
pub mod raw;

pub use codechef::CodeChefFetcher;
pub use codeforces::CodeforcesFetcher;
pub use gfg::GfgFetcher;
pub use handle::FetcherHandle;
pub use leetcode::LeetCodeFetcher;
pub use raw::RawPlatformResponse;

/// 平台抓取器
///
/// 实现方自己负责请求超时；"用户不存在"和网络错误都以 `Err` 返回，
/// 聚合器不区分两者。必须可以和其它抓取器并发调用。
#[async_trait]
pub trait SourceFetcher: Send + Sync + 'static {
    fn platform(&self) -> PlatformName;

    async fn fetch(&self, username: &str) -> Result<PlatformStats, FetchError>;
}

/// 所有内置平台的抓取器，共用同一个 HTTP 句柄
pub fn default_fetchers(handle: Arc<FetcherHandle>) -> Vec<Arc<dyn SourceFetcher>> {
    vec![
        Arc::new(LeetCodeFetcher::new(handle.clone())),
        Arc::new(CodeforcesFetcher::new(handle.clone())),
        Arc::new(CodeChefFetcher::new(handle.clone())),
        Arc::new(GfgFetcher::new(handle)),
    ]
}

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("valid regex")
});
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// 去掉标签后的页面文本，空白折叠为单个空格
pub(crate) fn page_text(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let text = TAG_RE.replace_all(&without_scripts, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");
    SPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// 取第一个捕获组里的数字
pub(crate) fn capture_number(re: &Regex, text: &str) -> Option<u64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
