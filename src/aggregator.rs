//! Periodic feed scraping.
//!
//! Every tick claims the single least-recently-fetched feed, stamps it as
//! fetched, downloads it and stores its items as posts. One feed per tick
//! gives round-robin coverage of every registered feed. Failures only end
//! the current cycle; the loop itself runs until the process is stopped.

use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::{GatorError, Result};
use crate::domain::Post;
use crate::fetcher::{FeedFetcher, DEFAULT_REQUEST_TIMEOUT};
use crate::normalizer::{parse_pub_date, ParsedItem};
use crate::store::Store;

/// Source of "now" for fetch bookkeeping.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Waits between scrape cycles.
#[async_trait]
pub trait Ticker {
    /// Wait for the next tick. Returns `false` once no more ticks will come.
    async fn tick(&mut self) -> bool;
}

/// Fixed-period ticker backed by a tokio interval.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// The first tick fires one full `period` from now.
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Outcome of one scrape cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeReport {
    pub feed_id: Uuid,
    pub feed_url: String,
    pub inserted: usize,
    pub duplicates: usize,
    pub bad_dates: usize,
    pub failed: usize,
}

pub struct Aggregator {
    store: Arc<dyn Store + Send + Sync>,
    fetcher: Arc<dyn FeedFetcher + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    request_timeout: Duration,
}

impl Aggregator {
    pub fn new(
        store: Arc<dyn Store + Send + Sync>,
        fetcher: Arc<dyn FeedFetcher + Send + Sync>,
    ) -> Self {
        Self {
            store,
            fetcher,
            clock: Arc::new(SystemClock),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Scrape immediately, then once per tick until the ticker runs dry.
    pub async fn run<T: Ticker + Send>(&self, ticker: &mut T) {
        loop {
            self.run_cycle().await;

            if !ticker.tick().await {
                break;
            }
        }
    }

    /// One logged cycle. Errors are reported and swallowed so the loop
    /// keeps going.
    async fn run_cycle(&self) {
        match self.scrape_once().await {
            Ok(Some(report)) => info!(
                feed = %report.feed_url,
                inserted = report.inserted,
                duplicates = report.duplicates,
                bad_dates = report.bad_dates,
                failed = report.failed,
                "Scrape cycle complete"
            ),
            Ok(None) => info!("No feeds to fetch"),
            Err(e @ GatorError::Store(_)) => error!("Scrape cycle aborted: {}", e),
            Err(e) => warn!("Scrape cycle failed: {}", e),
        }
    }

    /// Claim the next feed, fetch it and ingest its items.
    ///
    /// Returns `Ok(None)` when there are no feeds. The feed is marked as
    /// fetched before the request goes out, so a failing source waits for
    /// its next turn in the rotation instead of being retried right away.
    pub async fn scrape_once(&self) -> Result<Option<ScrapeReport>> {
        let Some(feed) = self.store.next_feed_to_fetch()? else {
            return Ok(None);
        };

        self.store.mark_feed_fetched(feed.id, self.clock.now())?;
        debug!(feed = %feed.url, "Fetching feed");

        let parsed = self.fetcher.fetch(&feed.url, self.request_timeout).await?;

        let mut report = ScrapeReport {
            feed_id: feed.id,
            feed_url: feed.url.clone(),
            ..Default::default()
        };

        for item in &parsed.items {
            self.ingest_item(feed.id, item, &mut report);
        }

        Ok(Some(report))
    }

    fn ingest_item(&self, feed_id: Uuid, item: &ParsedItem, report: &mut ScrapeReport) {
        let Some(published_at) = parse_pub_date(&item.pub_date) else {
            warn!(
                url = %item.link,
                pub_date = %item.pub_date,
                "Skipping item with unparseable publication date"
            );
            report.bad_dates += 1;
            return;
        };

        let post = Post::new(feed_id, item.title.as_str(), item.link.as_str())
            .with_description(&item.description)
            .with_published_at(published_at);

        match self.store.create_post(&post) {
            Ok(()) => report.inserted += 1,
            Err(GatorError::Conflict(_)) => {
                debug!(url = %post.url, "Post already stored");
                report.duplicates += 1;
            }
            Err(e) => {
                warn!(url = %post.url, "Failed to store post: {}", e);
                report.failed += 1;
            }
        }
    }
}

/// Parse an interval like "1m", "1m30s", "1.5h", "500ms" or bare seconds.
pub fn parse_interval(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err("Interval must not be empty".to_string());
    }

    let total = if s.chars().all(|c| c.is_ascii_digit()) {
        s.parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| format!("Invalid interval: {}", s))?
    } else {
        parse_compound_interval(&s)?
    };

    if total.is_zero() {
        return Err(format!("Interval must be greater than zero: {}", s));
    }
    Ok(total)
}

const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Fraction digits past this many are below nanosecond precision for every unit.
const MAX_FRACTION_DIGITS: usize = 18;

fn parse_compound_interval(s: &str) -> std::result::Result<Duration, String> {
    let invalid = || format!("Invalid interval: {}. Use format like '1m', '30s', '1h30m', '1.5h'", s);

    let mut total: u128 = 0;
    let mut rest = s;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(invalid)?;
        let (whole, fraction) = match rest[..number_len].split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (&rest[..number_len], ""),
        };
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(invalid());
        }
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit: u128 = match &rest[..unit_len] {
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3600 * NANOS_PER_SEC,
            "d" => 86400 * NANOS_PER_SEC,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse::<u64>().map_err(|_| invalid())?.into()
        };
        let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
        let fraction_nanos = if fraction.is_empty() {
            0
        } else {
            let digits: u128 = fraction.parse().map_err(|_| invalid())?;
            digits * unit / 10u128.pow(fraction.len() as u32)
        };

        total = whole
            .checked_mul(unit)
            .and_then(|n| n.checked_add(fraction_nanos))
            .and_then(|n| total.checked_add(n))
            .ok_or_else(invalid)?;
    }

    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_| invalid())
}

/// Format an interval with compound units, e.g. "1m30s" or "1h".
pub fn format_interval(interval: Duration) -> String {
    let mut secs = interval.as_secs();
    let mut out = String::new();

    for (unit, size) in [("d", 86400), ("h", 3600), ("m", 60), ("s", 1)] {
        if secs >= size {
            let _ = write!(out, "{}{}", secs / size, unit);
            secs %= size;
        }
    }

    let millis = interval.subsec_millis();
    if millis > 0 {
        let _ = write!(out, "{}ms", millis);
    }

    if out.is_empty() {
        let _ = write!(out, "{}ns", interval.subsec_nanos());
    }
    out
}
