//! Reading and writing stage artifacts as CSV.

use crate::frames::error::DataError;
use crate::utils::ensure_parent_exists;
use log::{debug, info};
use polars::prelude::*;
use std::path::Path;
use tempfile::NamedTempFile;

/// Timestamp format used for every `utc_time` column written by the pipeline.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reads a CSV file (plain or gzip-compressed) with a header row.
///
/// The whole file is scanned for schema inference so that a column whose first
/// rows happen to look integral is still read as float.
pub fn read_csv(path: &Path) -> Result<DataFrame, DataError> {
    if !path.is_file() {
        return Err(DataError::MissingUpstreamFile(path.to_path_buf()));
    }
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| DataError::CsvRead {
            path: path.to_path_buf(),
            source: e,
        })?
        .finish()
        .map_err(|e| DataError::CsvRead {
            path: path.to_path_buf(),
            source: e,
        })?;
    debug!("Read {:?} rows from {}", df.shape(), path.display());
    Ok(df)
}

/// Writes a DataFrame as CSV, replacing `path` only once the file is complete.
///
/// Rows go to a temporary file in the destination directory which is then renamed
/// over the target, so an interrupted run never leaves a truncated artifact behind.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    ensure_parent_exists(path)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().map_err(|e| DataError::WriteIo(path.to_path_buf(), e))?,
    };
    let mut temp_file =
        NamedTempFile::new_in(&dir).map_err(|e| DataError::WriteIo(path.to_path_buf(), e))?;

    CsvWriter::new(temp_file.as_file_mut())
        .include_header(true)
        .with_datetime_format(Some(TIME_FORMAT.to_string()))
        .finish(df)
        .map_err(|e| DataError::CsvWrite {
            path: path.to_path_buf(),
            source: e,
        })?;

    temp_file
        .persist(path)
        .map_err(|e| DataError::WriteIo(path.to_path_buf(), e.error))?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported_as_upstream() {
        let err = read_csv(Path::new("/no/such/file.csv")).unwrap_err();
        assert!(matches!(err, DataError::MissingUpstreamFile(_)));
    }

    #[test]
    fn write_then_read_keeps_rows_and_creates_dirs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("out.csv");
        let mut df = DataFrame::new(vec![
            Column::new("station_id".into(), vec!["BL0".to_string(), "CD1".to_string()]),
            Column::new("PM2.5".into(), vec![Some(1.5), None]),
        ])?;
        write_csv(&mut df, &path)?;

        let back = read_csv(&path)?;
        assert_eq!(back.height(), 2);
        assert_eq!(back.column("PM2.5")?.f64()?.get(0), Some(1.5));
        assert_eq!(back.column("PM2.5")?.null_count(), 1);
        Ok(())
    }

    #[test]
    fn whole_file_is_used_for_inference() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("late_float.csv");
        let mut body = String::from("station_id,PM10\n");
        for _ in 0..200 {
            body.push_str("BL0,3\n");
        }
        body.push_str("BL0,4.5\n");
        std::fs::write(&path, body)?;

        let df = read_csv(&path)?;
        assert_eq!(df.height(), 201);
        assert_eq!(df.column("PM10")?.dtype(), &DataType::Float64);
        Ok(())
    }
}
