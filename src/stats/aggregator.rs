use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::join_all;
use tokio::time::{Instant, timeout_at};

use super::{AggregateSnapshot, PlatformIdentity, PlatformName, PlatformStats};
use crate::fetchers::SourceFetcher;

/// 并发抓取所有已配置平台并汇总
///
/// 所有抓取都会等到结束（成功、失败或超时），任何一个平台的结果都不会取消或丢弃其它平台。
/// 超过整体截止时间仍未返回的平台按失败处理。
pub struct Aggregator {
    fetchers: HashMap<PlatformName, Arc<dyn SourceFetcher>>,
    deadline: Duration,
}

impl Aggregator {
    pub fn new(fetchers: impl IntoIterator<Item = Arc<dyn SourceFetcher>>, deadline: Duration) -> Self {
        let fetchers = fetchers
            .into_iter()
            .map(|fetcher| (fetcher.platform(), fetcher))
            .collect();
        Self { fetchers, deadline }
    }

    pub async fn aggregate(&self, identities: &[PlatformIdentity]) -> AggregateSnapshot {
        // 同一平台出现多次时以最后一个为准
        let mut platforms: BTreeMap<PlatformName, PlatformStats> = identities
            .iter()
            .map(|identity| (identity.platform, PlatformStats::unfetched(identity)))
            .collect();

        let deadline = Instant::now() + self.deadline;
        let pending: Vec<_> = platforms
            .iter()
            .filter(|(_, slot)| slot.is_configured())
            .filter_map(|(platform, slot)| match self.fetchers.get(platform) {
                Some(fetcher) => Some(Self::fetch_one(
                    fetcher.clone(),
                    *platform,
                    slot.username.clone(),
                    deadline,
                )),
                None => {
                    tracing::warn!("no fetcher registered for {}, counting it as failed", platform);
                    None
                }
            })
            .collect();

        for (platform, fetched) in join_all(pending).await {
            if let (Some(stats), Some(slot)) = (fetched, platforms.get_mut(&platform)) {
                slot.apply(stats);
            }
        }

        AggregateSnapshot::from_platforms(platforms, Utc::now())
    }

    async fn fetch_one(
        fetcher: Arc<dyn SourceFetcher>,
        platform: PlatformName,
        username: String,
        deadline: Instant,
    ) -> (PlatformName, Option<PlatformStats>) {
        let attempt = AssertUnwindSafe(fetcher.fetch(&username)).catch_unwind();

        let fetched = match timeout_at(deadline, attempt).await {
            Ok(Ok(Ok(stats))) => Some(stats),
            Ok(Ok(Err(e))) => {
                tracing::warn!("{} fetch for {} failed: {}", platform, username, e);
                None
            }
            Ok(Err(_)) => {
                tracing::error!("{} fetcher panicked for {}", platform, username);
                None
            }
            Err(_) => {
                tracing::warn!("{} fetch for {} hit the aggregation deadline", platform, username);
                None
            }
        };

        (platform, fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::testing::{Script, ScriptedFetcher};

    fn identity(platform: PlatformName, username: &str) -> PlatformIdentity {
        PlatformIdentity::new(platform, username)
    }

    #[tokio::test]
    async fn failed_platform_counts_but_contributes_zero() {
        let leetcode = ScriptedFetcher::new(PlatformName::LeetCode, Script::succeed(120, 1500));
        let codeforces = ScriptedFetcher::new(PlatformName::Codeforces, Script::succeed(999, 3000));
        let codechef = ScriptedFetcher::new(PlatformName::CodeChef, Script::Fail);
        let aggregator = Aggregator::new(
            [leetcode.clone().into_dyn(), codeforces.clone().into_dyn(), codechef.clone().into_dyn()],
            Duration::from_secs(5),
        );

        let snapshot = aggregator
            .aggregate(&[
                identity(PlatformName::LeetCode, "alice"),
                identity(PlatformName::Codeforces, ""),
                identity(PlatformName::CodeChef, "bob"),
            ])
            .await;

        assert_eq!(snapshot.platform_count, 2);
        assert_eq!(snapshot.total_solved, 120);
        assert_eq!(snapshot.best_rating, 1500);

        let chef = &snapshot.platforms[&PlatformName::CodeChef];
        assert_eq!((chef.solved, chef.rating, chef.fetched_ok), (0, 0, false));
        assert!(snapshot.platforms[&PlatformName::LeetCode].fetched_ok);

        // 未配置用户名的平台不会被抓取
        assert_eq!(codeforces.calls(), 0);
        assert_eq!(leetcode.calls(), 1);
        assert_eq!(codechef.calls(), 1);
    }

    #[tokio::test]
    async fn hung_fetcher_is_cut_off_by_deadline() {
        let fast = ScriptedFetcher::new(PlatformName::LeetCode, Script::succeed(10, 1200));
        let hung = ScriptedFetcher::new(PlatformName::Gfg, Script::Hang);
        let aggregator = Aggregator::new(
            [fast.into_dyn(), hung.into_dyn()],
            Duration::from_millis(50),
        );

        let started = std::time::Instant::now();
        let snapshot = aggregator
            .aggregate(&[
                identity(PlatformName::LeetCode, "alice"),
                identity(PlatformName::Gfg, "alice_gfg"),
            ])
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(snapshot.platform_count, 2);
        assert_eq!(snapshot.total_solved, 10);
        assert!(!snapshot.platforms[&PlatformName::Gfg].fetched_ok);
    }

    #[tokio::test]
    async fn panicking_fetcher_does_not_take_down_the_others() {
        let ok = ScriptedFetcher::new(PlatformName::Codeforces, Script::succeed(40, 1700));
        let broken = ScriptedFetcher::new(PlatformName::CodeChef, Script::Panic);
        let aggregator = Aggregator::new([ok.into_dyn(), broken.into_dyn()], Duration::from_secs(5));

        let snapshot = aggregator
            .aggregate(&[
                identity(PlatformName::Codeforces, "carol"),
                identity(PlatformName::CodeChef, "carol"),
            ])
            .await;

        assert_eq!(snapshot.total_solved, 40);
        assert_eq!(snapshot.best_rating, 1700);
        assert!(!snapshot.platforms[&PlatformName::CodeChef].fetched_ok);
    }

    #[tokio::test]
    async fn platform_without_fetcher_is_a_failure() {
        let aggregator = Aggregator::new(Vec::new(), Duration::from_secs(1));
        let snapshot = aggregator
            .aggregate(&[identity(PlatformName::LeetCode, "alice")])
            .await;

        assert_eq!(snapshot.platform_count, 1);
        assert_eq!(snapshot.total_solved, 0);
        assert!(!snapshot.platforms[&PlatformName::LeetCode].fetched_ok);
    }

    #[tokio::test]
    async fn slot_keeps_configured_username_and_profile() {
        let fetcher = ScriptedFetcher::new(PlatformName::LeetCode, Script::succeed(5, 1400));
        let aggregator = Aggregator::new([fetcher.into_dyn()], Duration::from_secs(1));

        let mut alice = identity(PlatformName::LeetCode, "  alice ");
        alice.profile = Some("https://leetcode.com/u/alice".into());
        let snapshot = aggregator.aggregate(&[alice]).await;

        let slot = &snapshot.platforms[&PlatformName::LeetCode];
        assert_eq!(slot.username, "alice");
        assert_eq!(slot.profile.as_deref(), Some("https://leetcode.com/u/alice"));
        assert_eq!(slot.solved, 5);
    }
}
