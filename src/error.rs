use crate::cache::error::CacheError;
use crate::frames::error::DataError;
use crate::retrieval::error::RetrievalError;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Could not parse '{0}' as a YYYY-MM-DD date")]
    DateParsing(String),

    #[error("Forecast horizon needs two different days, got {0} twice")]
    InvalidHorizon(NaiveDate),

    #[error("Labeling offset must be at least one hour")]
    InvalidOffset,
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(e: polars::error::PolarsError) -> Self {
        PipelineError::Data(DataError::from(e))
    }
}
