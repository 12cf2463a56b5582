use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Required upstream file '{0}' does not exist")]
    MissingUpstreamFile(PathBuf),

    #[error("No upstream files found in '{0}'")]
    EmptyUpstreamDir(PathBuf),

    #[error("Failed to list directory '{0}'")]
    DirRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to create directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Table '{table}' is missing required columns {missing:?} (found {found:?})")]
    SchemaMismatch {
        table: String,
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("Table '{table}' has {found} columns, expected {expected}")]
    WidthMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("Parsing error reading CSV file '{path}'")]
    CsvRead {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("Encoding error writing CSV file '{path}'")]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("I/O error writing '{0}'")]
    WriteIo(PathBuf, #[source] std::io::Error),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
