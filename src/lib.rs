//! # Gator
//!
//! A command-line RSS feed aggregator.
//!
//! ## Architecture
//!
//! ```text
//! CLI → CommandTable → commands → Store
//!                        ↓
//!            Aggregator → Fetcher → Normalizer → Store
//! ```
//!
//! - [`cli`]: argument capture and name-to-handler dispatch
//! - [`aggregator`]: the periodic scrape loop
//! - [`fetcher`]: HTTP fetching with a per-request deadline
//! - [`normalizer`]: RSS parsing, entity unescaping and date parsing
//! - [`store`]: SQLite persistence layer
//!
//! ## Quick Start
//!
//! ```bash
//! gator register alice
//! gator addfeed "Hacker News" https://hnrss.org/newest
//! gator agg 1m
//! gator browse 5
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct carries the config, store and
/// fetcher into every command.
pub mod app;

/// Periodic feed scraping.
///
/// One feed per tick, least-recently-fetched first, with idempotent post
/// ingestion.
pub mod aggregator;

/// Command-line interface and command dispatch.
///
/// - `register <name>` / `login <name>` / `reset` / `users`
/// - `agg <interval>` - run the scrape loop
/// - `addfeed <name> <url>` / `feeds`
/// - `follow <url>` / `following` / `unfollow <url>`
/// - `browse [limit]`
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.gatorconfig.toml`.
pub mod config;

/// Core domain models: users, feeds, follows and posts.
pub mod domain;

/// HTTP fetching.
///
/// - [`FeedFetcher`](fetcher::FeedFetcher): async trait for feed fetching
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// RSS parsing and normalization.
pub mod normalizer;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
