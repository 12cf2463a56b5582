use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Endpoint returned no data for {0}")]
    Empty(String),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read response body from {0}")]
    ResponseBody(String, #[source] reqwest::Error),

    #[error("Failed to create raw data directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to write raw data file '{0}'")]
    FileWrite(PathBuf, #[source] std::io::Error),
}

impl RetrievalError {
    /// Whether the pipeline should log and skip this partition instead of aborting.
    ///
    /// Only local filesystem failures abort retrieval; every endpoint failure is skipped
    /// and picked up again on the next run.
    pub fn is_skippable(&self) -> bool {
        !matches!(
            self,
            RetrievalError::ClientBuild(..)
                | RetrievalError::DirCreation(..)
                | RetrievalError::FileWrite(..)
        )
    }
}
