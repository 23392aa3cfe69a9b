use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedFollow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub feed_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedFollow {
    pub fn new(user_id: Uuid, feed_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            feed_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A follow row together with the names it links.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedFollowDetails {
    pub follow: FeedFollow,
    pub user_name: String,
    pub feed_name: String,
    pub feed_url: String,
}
