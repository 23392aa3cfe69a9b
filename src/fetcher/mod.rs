pub mod http_fetcher;

use std::time::Duration;

use async_trait::async_trait;

use crate::app::Result;
use crate::normalizer::ParsedFeed;

pub use http_fetcher::HttpFetcher;

/// Per-request deadline used when nothing else is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait FeedFetcher {
    /// Fetch `url` and parse it, giving up after `deadline`.
    async fn fetch(&self, url: &str, deadline: Duration) -> Result<ParsedFeed>;
}
