use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitLab API error: {status} ({url})")]
    Api {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Failed to parse {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No pipeline found for {0}")]
    NoPipeline(String),

    #[error("No job named '{name}' in pipelines of commit {sha}")]
    JobNotFound { name: String, sha: String },

    #[error("Pipeline #{0} has no jobs")]
    EmptyPipeline(u64),

    #[error("box not found at index {0}")]
    BoxNotFound(usize),

    #[error("Could not open the browser: {0}")]
    Browser(String),

    #[error("{0} thread stopped unexpectedly")]
    Disconnected(&'static str),
}
