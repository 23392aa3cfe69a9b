pub mod sqlite;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::app::Result;
use crate::domain::{Feed, FeedFollow, FeedFollowDetails, FeedWithOwner, Post, User};

pub use sqlite::SqliteStore;

/// Persistence contract shared by the command handlers and the aggregator.
///
/// Creates that would break a uniqueness rule (user name, feed URL, post URL,
/// or a repeated follow) fail with [`GatorError::Conflict`](crate::app::GatorError::Conflict).
pub trait Store {
    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user_by_name(&self, name: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;
    fn delete_all_users(&self) -> Result<usize>;

    // Feed operations
    fn create_feed(&self, feed: &Feed) -> Result<()>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;
    fn list_feeds_with_owner(&self) -> Result<Vec<FeedWithOwner>>;
    fn next_feed_to_fetch(&self) -> Result<Option<Feed>>;
    fn mark_feed_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    // Follow operations
    fn create_feed_follow(&self, follow: &FeedFollow) -> Result<FeedFollowDetails>;
    fn delete_feed_follow(&self, user_id: Uuid, feed_url: &str) -> Result<bool>;
    fn list_feed_follows_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollowDetails>>;

    // Post operations
    fn create_post(&self, post: &Post) -> Result<()>;
    fn get_posts_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<Post>>;
}
