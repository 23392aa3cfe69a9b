use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gator::app::AppContext;
use gator::cli::{Cli, CommandTable};
use gator::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays on stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gator=info")))
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let mut ctx = AppContext::new(config)?;

    CommandTable::standard()
        .run(&mut ctx, &cli.command, &cli.args)
        .await?;

    Ok(())
}
