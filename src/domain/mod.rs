pub mod feed;
pub mod feed_follow;
pub mod post;
pub mod user;

pub use feed::{Feed, FeedWithOwner};
pub use feed_follow::{FeedFollow, FeedFollowDetails};
pub use post::Post;
pub use user::User;
