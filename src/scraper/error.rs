//! Error types for fetching, extracting and snapshotting pages

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network / client failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("GET {url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid selector {0:?}")]
    Selector(String),

    /// A quote block lacks one of its required children
    #[error("quote block #{index} has no {field} element")]
    MissingElement { index: usize, field: &'static str },

    #[error("snapshot failed for {url}: {reason}")]
    Snapshot { url: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
