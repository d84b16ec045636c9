use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Login page unusable or credentials rejected
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Scoreboard page does not have the expected structure
    #[error("problem discovery failed: {0}")]
    Discovery(String),

    #[error("request to {url} failed with status {status}")]
    Fetch {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to extract sample archive: {0}")]
    Extraction(String),

    #[error("failed to merge documents: {0}")]
    Merge(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
