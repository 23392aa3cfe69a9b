pub mod commands;
pub mod dispatch;

use std::path::PathBuf;

use clap::Parser;

pub use dispatch::{CommandTable, Handler, LoggedIn, UserHandler};

#[derive(Parser, Debug)]
#[command(name = "gator")]
#[command(about = "A command-line RSS feed aggregator", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ~/.gatorconfig.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Command to run: register, login, reset, users, agg, addfeed, feeds,
    /// follow, following, unfollow, browse
    pub command: String,

    /// Arguments passed to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
