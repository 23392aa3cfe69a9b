use std::time::Duration;

use tracing::info;
use url::Url;

use crate::aggregator::{format_interval, Aggregator, IntervalTicker};
use crate::app::{AppContext, GatorError, Result};
use crate::domain::{Feed, FeedFollow, FeedFollowDetails, FeedWithOwner, Post, User};

pub const DEFAULT_BROWSE_LIMIT: usize = 2;

pub fn register(ctx: &mut AppContext, name: &str) -> Result<User> {
    if ctx.store.get_user_by_name(name)?.is_some() {
        return Err(GatorError::Conflict(format!(
            "user with name {} already exists",
            name
        )));
    }

    let user = User::new(name);
    ctx.store.create_user(&user)?;
    ctx.config.set_user(name)?;

    info!(user = %user.name, id = %user.id, "User created");
    println!("User {} has been created", name);
    Ok(user)
}

pub fn login(ctx: &mut AppContext, name: &str) -> Result<User> {
    let user = ctx
        .store
        .get_user_by_name(name)?
        .ok_or_else(|| GatorError::NotFound(format!("user with name {} does not exist", name)))?;

    ctx.config.set_user(name)?;
    println!("User has been set to: {}", name);
    Ok(user)
}

pub fn reset(ctx: &AppContext) -> Result<usize> {
    let removed = ctx.store.delete_all_users()?;
    println!("All users have been deleted");
    Ok(removed)
}

pub fn list_users(ctx: &AppContext) -> Result<Vec<User>> {
    let users = ctx.store.list_users()?;
    let current = ctx.config.current_user_name.as_deref();

    for user in &users {
        if Some(user.name.as_str()) == current {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }

    Ok(users)
}

/// Run the scrape loop at `interval`. Only returns on error.
pub async fn aggregate(ctx: &AppContext, interval: Duration) -> Result<()> {
    println!("Collecting feeds every {}", format_interval(interval));

    let aggregator = Aggregator::new(ctx.store.clone(), ctx.fetcher.clone());
    let mut ticker = IntervalTicker::new(interval);
    aggregator.run(&mut ticker).await;

    Ok(())
}

/// Create a feed owned by `user` and follow it.
pub fn add_feed(
    ctx: &AppContext,
    user: &User,
    name: &str,
    url: &str,
) -> Result<(Feed, FeedFollowDetails)> {
    validate_feed_url(url)?;

    let feed = Feed::new(name, url, user.id);
    ctx.store.create_feed(&feed)?;
    let follow = ctx
        .store
        .create_feed_follow(&FeedFollow::new(user.id, feed.id))?;

    println!("Feed created:");
    println!("  Name: {}", feed.name);
    println!("  URL:  {}", feed.url);
    println!("Followed by: {}", follow.user_name);
    Ok((feed, follow))
}

fn validate_feed_url(url: &str) -> Result<()> {
    let parsed =
        Url::parse(url).map_err(|e| GatorError::Validation(format!("invalid feed URL {}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(GatorError::Validation(format!(
            "feed URL must use http or https, got {}",
            scheme
        ))),
    }
}

pub fn list_feeds(ctx: &AppContext) -> Result<Vec<FeedWithOwner>> {
    let feeds = ctx.store.list_feeds_with_owner()?;

    if feeds.is_empty() {
        println!("No feeds");
    }

    for entry in &feeds {
        println!("Feed Name: {}", entry.feed.display_name());
        println!("Feed URL: {}", entry.feed.url);
        println!("Created by: {}\n", entry.owner_name);
    }

    Ok(feeds)
}

pub fn follow(ctx: &AppContext, user: &User, url: &str) -> Result<FeedFollowDetails> {
    let feed = ctx
        .store
        .get_feed_by_url(url)?
        .ok_or_else(|| GatorError::NotFound(format!("no feed with URL {}", url)))?;

    let follow = ctx
        .store
        .create_feed_follow(&FeedFollow::new(user.id, feed.id))?;

    println!("Feed: {}", follow.feed_name);
    println!("Followed by: {}", follow.user_name);
    Ok(follow)
}

pub fn following(ctx: &AppContext, user: &User) -> Result<Vec<FeedFollowDetails>> {
    let follows = ctx.store.list_feed_follows_for_user(user.id)?;

    if follows.is_empty() {
        println!("{} is not following any feeds", user.name);
    }

    for follow in &follows {
        println!("* {}", follow.feed_name);
    }

    Ok(follows)
}

pub fn unfollow(ctx: &AppContext, user: &User, url: &str) -> Result<()> {
    if !ctx.store.delete_feed_follow(user.id, url)? {
        return Err(GatorError::NotFound(format!(
            "{} is not following a feed with URL {}",
            user.name, url
        )));
    }

    println!("Unfollowed feed with URL: {}", url);
    Ok(())
}

pub fn browse(ctx: &AppContext, user: &User, limit: usize) -> Result<Vec<Post>> {
    let posts = ctx.store.get_posts_for_user(user.id, limit)?;

    if posts.is_empty() {
        println!("No posts");
    }

    for post in &posts {
        let published = post
            .published_at
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        println!("Title: {}", post.display_title());
        println!("URL: {}", post.url);
        println!(
            "Description: {}",
            post.description.as_deref().unwrap_or("(none)")
        );
        println!("Published At: {}\n", published);
    }

    Ok(posts)
}
