pub mod error;
pub mod manifest;

use crate::cache::manifest::{CacheKey, CacheManifest};
use crate::error::PipelineError;
use crate::frames::io::TIME_FORMAT;
use crate::frames::schema::{from_millis, time_millis};
use polars::prelude::DataFrame;
use std::path::Path;

/// Writes the manifest of an artifact just built with `key`.
pub fn record_artifact(df: &DataFrame, key: CacheKey, artifact: &Path) -> Result<(), PipelineError> {
    let times = time_millis(df)?;
    let format = |ms: Option<&i64>| {
        ms.and_then(|ms| from_millis(*ms))
            .map(|t| t.format(TIME_FORMAT).to_string())
    };
    CacheManifest {
        key,
        rows: df.height(),
        first_time: format(times.iter().min()),
        last_time: format(times.iter().max()),
    }
    .write(artifact)?;
    Ok(())
}
