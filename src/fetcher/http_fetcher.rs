use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::app::{GatorError, Result};
use crate::fetcher::FeedFetcher;
use crate::normalizer::{self, ParsedFeed};

const USER_AGENT: &str = concat!("gator/", env!("CARGO_PKG_VERSION"));

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .gzip(true)
            .brotli(true)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, deadline: Duration) -> Result<ParsedFeed> {
        let response = self.client.get(url).timeout(deadline).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GatorError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await?;
        normalizer::parse_feed(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Mock &amp;amp; Feed</title>
    <link>https://example.com</link>
    <description>Served by a mock</description>
    <item>
      <title>Hello</title>
      <link>https://example.com/hello</link>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn test_fetch_parses_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/feed.xml").header("user-agent", USER_AGENT);
                then.status(200)
                    .header("Content-Type", "application/rss+xml")
                    .body(FEED);
            })
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let feed = fetcher
            .fetch(&server.url("/feed.xml"), Duration::from_secs(5))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(feed.title, "Mock & Feed");
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].link, "https://example.com/hello");
    }

    #[tokio::test]
    async fn test_non_200_is_http_status_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gone.xml");
                then.status(404);
            })
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&server.url("/gone.xml"), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            GatorError::HttpStatus { status, .. } => assert_eq!(status, StatusCode::NOT_FOUND),
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_other_success_status_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/feed.xml");
                then.status(203).body(FEED);
            })
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&server.url("/feed.xml"), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::HttpStatus { .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/feed.xml");
                then.status(200).body("<html><body>not a feed</body></html>");
            })
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&server.url("/feed.xml"), Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::Parse(_)));
    }

    #[tokio::test]
    async fn test_deadline_is_network_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow.xml");
                then.status(200).delay(Duration::from_secs(2)).body(FEED);
            })
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&server.url("/slow.xml"), Duration::from_millis(100))
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::Network(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:1/feed.xml", Duration::from_secs(2))
            .await
            .unwrap_err();

        assert!(matches!(err, GatorError::Network(_)));
    }
}
