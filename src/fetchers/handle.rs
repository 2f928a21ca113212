use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::Client;
use tokio::sync::OnceCell;

use crate::error::FetchError;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// 抓取器共用的 HTTP 句柄
///
/// 第一次抓取时才创建客户端；`shutdown` 之后所有抓取直接失败。
pub struct FetcherHandle {
    client: OnceCell<Client>,
    timeout: Duration,
    closed: AtomicBool,
}

impl FetcherHandle {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: OnceCell::new(),
            timeout,
            closed: AtomicBool::new(false),
        }
    }

    pub async fn client(&self) -> Result<&Client, FetchError> {
        if self.is_closed() {
            return Err(FetchError::Closed);
        }

        self.client
            .get_or_try_init(|| async {
                tracing::debug!("Initializing fetcher HTTP client");
                Client::builder()
                    .user_agent(USER_AGENT)
                    .timeout(self.timeout)
                    .build()
            })
            .await
            .map_err(FetchError::Http)
    }

    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!("Fetcher handle shut down");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
