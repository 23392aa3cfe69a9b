use reqwest::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum GatorError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to fetch {url}: HTTP {status}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("Feed parsing error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl GatorError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, GatorError::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, GatorError>;
