use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};
use uuid::Uuid;

use crate::app::{GatorError, Result};
use crate::domain::{Feed, FeedFollow, FeedFollowDetails, FeedWithOwner, Post, User};
use crate::store::Store;

const FEED_COLUMNS: &str =
    "f.id, f.name, f.url, f.user_id, f.last_fetched_at, f.created_at, f.updated_at";

const POST_COLUMNS: &str = "p.id, p.feed_id, p.title, p.url, p.description, p.published_at, \
     p.created_at, p.updated_at";

const FOLLOW_DETAILS_QUERY: &str = "SELECT ff.id, ff.user_id, ff.feed_id, ff.created_at, \
     ff.updated_at, u.name, f.name, f.url
     FROM feed_follows ff
     JOIN users u ON u.id = ff.user_id
     JOIN feeds f ON f.id = ff.feed_id";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    /// Open the store named by a config `db_url`.
    ///
    /// Accepts a plain path, a `sqlite://` prefixed path, or `:memory:`.
    pub fn open_url(db_url: &str) -> Result<Self> {
        let path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
        if path == ":memory:" {
            return Self::in_memory();
        }

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::new(path)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| GatorError::Migration(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            GatorError::Store(rusqlite::Error::SqliteFailure(
                ffi::Error::new(ffi::SQLITE_MISUSE),
                Some(e.to_string()),
            ))
        })
    }

    fn feed_from_row(row: &Row) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: uuid_at(row, 0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            user_id: uuid_at(row, 3)?,
            last_fetched_at: opt_timestamp_at(row, 4)?,
            created_at: timestamp_at(row, 5)?,
            updated_at: timestamp_at(row, 6)?,
        })
    }

    fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
        Ok(Post {
            id: uuid_at(row, 0)?,
            feed_id: uuid_at(row, 1)?,
            title: row.get(2)?,
            url: row.get(3)?,
            description: row.get(4)?,
            published_at: opt_timestamp_at(row, 5)?,
            created_at: timestamp_at(row, 6)?,
            updated_at: timestamp_at(row, 7)?,
        })
    }

    fn user_from_row(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: uuid_at(row, 0)?,
            name: row.get(1)?,
            created_at: timestamp_at(row, 2)?,
            updated_at: timestamp_at(row, 3)?,
        })
    }

    fn follow_details_from_row(row: &Row) -> rusqlite::Result<FeedFollowDetails> {
        Ok(FeedFollowDetails {
            follow: FeedFollow {
                id: uuid_at(row, 0)?,
                user_id: uuid_at(row, 1)?,
                feed_id: uuid_at(row, 2)?,
                created_at: timestamp_at(row, 3)?,
                updated_at: timestamp_at(row, 4)?,
            },
            user_name: row.get(5)?,
            feed_name: row.get(6)?,
            feed_url: row.get(7)?,
        })
    }
}

/// Timestamps are stored with a fixed width so text order is time order.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn uuid_at(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(idx, &raw)
}

fn opt_timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| parse_timestamp(idx, &raw))
        .transpose()
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Turn a uniqueness violation into a `Conflict`, leaving other errors as-is.
fn conflict_or(err: rusqlite::Error, message: impl FnOnce() -> String) -> GatorError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY) =>
        {
            GatorError::Conflict(message())
        }
        _ => GatorError::Store(err),
    }
}

impl Store for SqliteStore {
    fn create_user(&self, user: &User) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO users (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.to_string(),
                user.name,
                format_timestamp(&user.created_at),
                format_timestamp(&user.updated_at)
            ],
        )
        .map_err(|e| conflict_or(e, || format!("user with name {} already exists", user.name)))?;

        Ok(())
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let conn = self.conn()?;

        let user = conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM users WHERE name = ?1",
                params![name],
                Self::user_from_row,
            )
            .optional()?;

        Ok(user)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare("SELECT id, name, created_at, updated_at FROM users ORDER BY name")?;
        let users = stmt
            .query_map([], Self::user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    fn delete_all_users(&self) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM users", [])?)
    }

    fn create_feed(&self, feed: &Feed) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO feeds (id, name, url, user_id, last_fetched_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                feed.id.to_string(),
                feed.name,
                feed.url,
                feed.user_id.to_string(),
                feed.last_fetched_at.as_ref().map(format_timestamp),
                format_timestamp(&feed.created_at),
                format_timestamp(&feed.updated_at)
            ],
        )
        .map_err(|e| conflict_or(e, || format!("feed with URL {} already exists", feed.url)))?;

        Ok(())
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        let feed = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.url = ?1"),
                params![url],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(feed)
    }

    fn list_feeds_with_owner(&self) -> Result<Vec<FeedWithOwner>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {FEED_COLUMNS}, u.name FROM feeds f
             JOIN users u ON u.id = f.user_id
             ORDER BY f.name, f.url"
        ))?;

        let feeds = stmt
            .query_map([], |row| {
                Ok(FeedWithOwner {
                    feed: Self::feed_from_row(row)?,
                    owner_name: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        let feed = conn
            .query_row(
                &format!(
                    "SELECT {FEED_COLUMNS} FROM feeds f
                     ORDER BY f.last_fetched_at ASC NULLS FIRST, f.created_at ASC
                     LIMIT 1"
                ),
                [],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(feed)
    }

    fn mark_feed_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE feeds SET last_fetched_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![format_timestamp(&at), feed_id.to_string()],
        )?;

        if updated == 0 {
            return Err(GatorError::NotFound(format!("feed {} does not exist", feed_id)));
        }
        Ok(())
    }

    fn create_feed_follow(&self, follow: &FeedFollow) -> Result<FeedFollowDetails> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO feed_follows (id, user_id, feed_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                follow.id.to_string(),
                follow.user_id.to_string(),
                follow.feed_id.to_string(),
                format_timestamp(&follow.created_at),
                format_timestamp(&follow.updated_at)
            ],
        )
        .map_err(|e| conflict_or(e, || "user already follows this feed".to_string()))?;

        let details = conn.query_row(
            &format!("{FOLLOW_DETAILS_QUERY} WHERE ff.id = ?1"),
            params![follow.id.to_string()],
            Self::follow_details_from_row,
        )?;

        Ok(details)
    }

    fn delete_feed_follow(&self, user_id: Uuid, feed_url: &str) -> Result<bool> {
        let conn = self.conn()?;

        let deleted = conn.execute(
            "DELETE FROM feed_follows
             WHERE user_id = ?1 AND feed_id IN (SELECT id FROM feeds WHERE url = ?2)",
            params![user_id.to_string(), feed_url],
        )?;

        Ok(deleted > 0)
    }

    fn list_feed_follows_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollowDetails>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "{FOLLOW_DETAILS_QUERY} WHERE ff.user_id = ?1 ORDER BY f.name, f.url"
        ))?;
        let follows = stmt
            .query_map(params![user_id.to_string()], Self::follow_details_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(follows)
    }

    fn create_post(&self, post: &Post) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO posts (id, feed_id, title, url, description, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                post.id.to_string(),
                post.feed_id.to_string(),
                post.title,
                post.url,
                post.description,
                post.published_at.as_ref().map(format_timestamp),
                format_timestamp(&post.created_at),
                format_timestamp(&post.updated_at)
            ],
        )
        .map_err(|e| conflict_or(e, || format!("post with URL {} already exists", post.url)))?;

        Ok(())
    }

    fn get_posts_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<Post>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts p
             JOIN feed_follows ff ON ff.feed_id = p.feed_id
             WHERE ff.user_id = ?1
             ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC
             LIMIT ?2"
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let posts = stmt
            .query_map(params![user_id.to_string(), limit], Self::post_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }
}
