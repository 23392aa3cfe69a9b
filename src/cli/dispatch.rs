//! Name-to-handler dispatch.
//!
//! Every command is a [`Handler`]. Commands that act on behalf of the
//! logged-in user implement [`UserHandler`] instead and are registered
//! wrapped in [`LoggedIn`], which resolves the current user first.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::aggregator::parse_interval;
use crate::app::{AppContext, GatorError, Result};
use crate::cli::commands::{self, DEFAULT_BROWSE_LIMIT};
use crate::domain::User;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn execute(&self, ctx: &mut AppContext, args: &[String]) -> Result<()>;
}

#[async_trait]
pub trait UserHandler: Send + Sync {
    async fn execute(&self, ctx: &mut AppContext, args: &[String], user: User) -> Result<()>;
}

/// Runs the inner handler only when the config names an existing user.
pub struct LoggedIn<H>(pub H);

#[async_trait]
impl<H: UserHandler> Handler for LoggedIn<H> {
    async fn execute(&self, ctx: &mut AppContext, args: &[String]) -> Result<()> {
        let user = ctx.current_user()?;
        self.0.execute(ctx, args, user).await
    }
}

pub struct CommandTable {
    handlers: BTreeMap<&'static str, Box<dyn Handler>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// The table with every gator command registered.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register("register", Register);
        table.register("login", Login);
        table.register("reset", Reset);
        table.register("users", Users);
        table.register("agg", Agg);
        table.register("addfeed", LoggedIn(AddFeed));
        table.register("feeds", Feeds);
        table.register("follow", LoggedIn(Follow));
        table.register("following", LoggedIn(Following));
        table.register("unfollow", LoggedIn(Unfollow));
        table.register("browse", LoggedIn(Browse));
        table
    }

    pub fn register(&mut self, name: &'static str, handler: impl Handler + 'static) {
        self.handlers.insert(name, Box::new(handler));
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    pub async fn run(&self, ctx: &mut AppContext, name: &str, args: &[String]) -> Result<()> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| GatorError::UnknownCommand(name.to_string()))?;

        handler.execute(ctx, args).await
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

fn required_arg<'a>(args: &'a [String], index: usize, usage: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| GatorError::Validation(format!("usage: {}", usage)))
}

fn parse_browse_limit(args: &[String]) -> Result<usize> {
    let Some(raw) = args.first() else {
        return Ok(DEFAULT_BROWSE_LIMIT);
    };

    match raw.parse::<usize>() {
        Ok(0) | Err(_) => Err(GatorError::Validation(format!(
            "browse limit must be a positive number, got {}",
            raw
        ))),
        Ok(limit) => Ok(limit),
    }
}

struct Register;

#[async_trait]
impl Handler for Register {
    async fn execute(&self, ctx: &mut AppContext, args: &[String]) -> Result<()> {
        let name = required_arg(args, 0, "register <name>")?;
        commands::register(ctx, name)?;
        Ok(())
    }
}

struct Login;

#[async_trait]
impl Handler for Login {
    async fn execute(&self, ctx: &mut AppContext, args: &[String]) -> Result<()> {
        let name = required_arg(args, 0, "login <name>")?;
        commands::login(ctx, name)?;
        Ok(())
    }
}

struct Reset;

#[async_trait]
impl Handler for Reset {
    async fn execute(&self, ctx: &mut AppContext, _args: &[String]) -> Result<()> {
        commands::reset(ctx)?;
        Ok(())
    }
}

struct Users;

#[async_trait]
impl Handler for Users {
    async fn execute(&self, ctx: &mut AppContext, _args: &[String]) -> Result<()> {
        commands::list_users(ctx)?;
        Ok(())
    }
}

struct Agg;

#[async_trait]
impl Handler for Agg {
    async fn execute(&self, ctx: &mut AppContext, args: &[String]) -> Result<()> {
        let raw = required_arg(args, 0, "agg <interval>  (e.g. 1m, 30s, 1h)")?;
        let interval = parse_interval(raw).map_err(GatorError::Validation)?;
        commands::aggregate(ctx, interval).await
    }
}

struct Feeds;

#[async_trait]
impl Handler for Feeds {
    async fn execute(&self, ctx: &mut AppContext, _args: &[String]) -> Result<()> {
        commands::list_feeds(ctx)?;
        Ok(())
    }
}

struct AddFeed;

#[async_trait]
impl UserHandler for AddFeed {
    async fn execute(&self, ctx: &mut AppContext, args: &[String], user: User) -> Result<()> {
        let name = required_arg(args, 0, "addfeed <name> <url>")?;
        let url = required_arg(args, 1, "addfeed <name> <url>")?;
        commands::add_feed(ctx, &user, name, url)?;
        Ok(())
    }
}

struct Follow;

#[async_trait]
impl UserHandler for Follow {
    async fn execute(&self, ctx: &mut AppContext, args: &[String], user: User) -> Result<()> {
        let url = required_arg(args, 0, "follow <url>")?;
        commands::follow(ctx, &user, url)?;
        Ok(())
    }
}

struct Following;

#[async_trait]
impl UserHandler for Following {
    async fn execute(&self, ctx: &mut AppContext, _args: &[String], user: User) -> Result<()> {
        commands::following(ctx, &user)?;
        Ok(())
    }
}

struct Unfollow;

#[async_trait]
impl UserHandler for Unfollow {
    async fn execute(&self, ctx: &mut AppContext, args: &[String], user: User) -> Result<()> {
        let url = required_arg(args, 0, "unfollow <url>")?;
        commands::unfollow(ctx, &user, url)
    }
}

struct Browse;

#[async_trait]
impl UserHandler for Browse {
    async fn execute(&self, ctx: &mut AppContext, args: &[String], user: User) -> Result<()> {
        let limit = parse_browse_limit(args)?;
        commands::browse(ctx, &user, limit)?;
        Ok(())
    }
}
