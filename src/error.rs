use std::path::PathBuf;

use thiserror::Error;

/// Failure to retrieve or parse a single feed.
///
/// Never escapes the fetcher: callers only see an empty item list.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed after {attempts} attempt(s): {source}")]
    Http {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt archive file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize archive record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reasons a summary could not be produced. Converted to "absent" at the
/// summarizer boundary.
#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("no API key in ${0}")]
    MissingApiKey(String),

    #[error("summarizer request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("summarizer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("summarizer response contained no content")]
    EmptyResponse,
}
