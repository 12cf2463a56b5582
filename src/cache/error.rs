use std::path::PathBuf;
use std::time::SystemTimeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read metadata for upstream file '{0}'")]
    MetadataRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to calculate modification time for {0:?}")]
    SystemTimeCalculation(PathBuf, #[source] SystemTimeError),

    #[error("Failed to encode cache manifest")]
    ManifestEncode(#[from] serde_json::Error),

    #[error("Failed to write cache manifest '{0}'")]
    ManifestWrite(PathBuf, #[source] std::io::Error),
}
