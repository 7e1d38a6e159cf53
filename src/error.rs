use std::path::PathBuf;

use thiserror::Error;

/// Failures outside the compiler core, which reports diagram problems as data.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("invalid sort direction: {0} (expected asc or desc)")]
    InvalidSortDirection(String),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read stdin: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
