//! Column names shared across stages and the boundary checks applied to every table
//! a stage reads.
//!
//! Each stage calls [`require_columns`] on its inputs before touching them, so a file
//! with a missing column fails fast with [`DataError::SchemaMismatch`] instead of
//! silently producing empty columns downstream.

use crate::frames::error::DataError;
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

pub const COL_STATION_ID: &str = "station_id";
pub const COL_UTC_TIME: &str = "utc_time";
pub const COL_LATITUDE: &str = "latitude";
pub const COL_LONGITUDE: &str = "longitude";

/// Key columns of every per-reading and per-feature table.
pub const KEY_COLUMNS: [&str; 2] = [COL_STATION_ID, COL_UTC_TIME];

// Raw timestamp layouts seen in the historical export and the live endpoint.
const TIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
];

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Fails with [`DataError::SchemaMismatch`] unless every `required` column is present.
pub fn require_columns(df: &DataFrame, table: &str, required: &[&str]) -> Result<(), DataError> {
    let found = column_names(df);
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !found.iter().any(|f| f == *name))
        .map(|name| name.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataError::SchemaMismatch {
            table: table.to_string(),
            missing,
            found,
        })
    }
}

/// Parses a raw timestamp, accepting the layouts the data sources are known to use.
pub fn parse_utc_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

pub fn to_millis(time: NaiveDateTime) -> i64 {
    time.and_utc().timestamp_millis()
}

pub fn from_millis(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

/// Builds a millisecond `Datetime` column from epoch milliseconds.
pub fn datetime_column(name: &str, millis: Vec<Option<i64>>) -> Result<Column, DataError> {
    let series = Series::new(name.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    Ok(series.into())
}

/// Reads a time-like column as epoch milliseconds.
///
/// String columns are parsed with [`parse_utc_time`]; unparsable cells become `None`.
fn column_millis(column: &Column) -> Result<Vec<Option<i64>>, DataError> {
    match column.dtype() {
        DataType::Datetime(_, _) | DataType::Date => {
            let ms = column
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                .cast(&DataType::Int64)?;
            Ok(ms.i64()?.into_iter().collect())
        }
        DataType::String => Ok(column
            .str()?
            .into_iter()
            .map(|raw| raw.and_then(parse_utc_time).map(to_millis))
            .collect()),
        _ => {
            let as_str = column.cast(&DataType::String)?;
            Ok(as_str
                .str()?
                .into_iter()
                .map(|raw| raw.and_then(parse_utc_time).map(to_millis))
                .collect())
        }
    }
}

/// Normalizes the key columns of a freshly read table.
///
/// `station_id` becomes a string column and `utc_time` a millisecond `Datetime`
/// column. Rows whose station id is missing or whose timestamp cannot be parsed are
/// malformed; they are dropped and counted.
pub fn normalize_keys(mut df: DataFrame, table: &str) -> Result<(DataFrame, usize), DataError> {
    require_columns(&df, table, &KEY_COLUMNS)?;

    let station = df.column(COL_STATION_ID)?.cast(&DataType::String)?;
    let millis = column_millis(df.column(COL_UTC_TIME)?)?;

    let keep: Vec<bool> = station
        .str()?
        .into_iter()
        .zip(millis.iter())
        .map(|(id, ms)| id.is_some_and(|id| !id.trim().is_empty()) && ms.is_some())
        .collect();
    let dropped = keep.iter().filter(|k| !**k).count();

    df.with_column(station)?;
    df.with_column(datetime_column(COL_UTC_TIME, millis)?)?;

    if dropped > 0 {
        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        df = df.filter(&mask)?;
    }
    Ok((df, dropped))
}

/// Sorts by (station_id, utc_time), keeping the input order of equal keys.
pub fn sort_by_key(df: DataFrame) -> Result<DataFrame, DataError> {
    Ok(df
        .lazy()
        .sort(
            KEY_COLUMNS,
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?)
}

/// Sorts by key and keeps the first row of every (station_id, utc_time) pair.
///
/// Returns the deduplicated table and the number of rows removed.
pub fn dedup_by_key(df: DataFrame) -> Result<(DataFrame, usize), DataError> {
    let df = sort_by_key(df)?;
    let stations = station_ids(&df)?;
    let times = time_millis(&df)?;

    let mut keep = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let duplicate = i > 0 && stations[i] == stations[i - 1] && times[i] == times[i - 1];
        keep.push(!duplicate);
    }
    let removed = keep.iter().filter(|k| !**k).count();
    if removed == 0 {
        return Ok((df, 0));
    }
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok((df.filter(&mask)?, removed))
}

/// Station ids of a normalized table, in row order.
pub fn station_ids(df: &DataFrame) -> Result<Vec<String>, DataError> {
    let ids = df.column(COL_STATION_ID)?.cast(&DataType::String)?;
    Ok(ids
        .str()?
        .into_iter()
        .map(|id| id.unwrap_or_default().to_string())
        .collect())
}

/// Timestamps of a normalized table as epoch milliseconds, in row order.
pub fn time_millis(df: &DataFrame) -> Result<Vec<i64>, DataError> {
    Ok(column_millis(df.column(COL_UTC_TIME)?)?
        .into_iter()
        .map(|ms| ms.unwrap_or_default())
        .collect())
}

/// A numeric column as optional floats; non-numeric cells become `None`.
pub fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    let values = df.column(name)?.cast(&DataType::Float64)?;
    Ok(values.f64()?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Column::new(
                "station_id".into(),
                vec![Some("BL0"), Some("BL0"), None, Some("CD1"), Some("BL0")],
            ),
            Column::new(
                "utc_time".into(),
                vec![
                    "2018-04-01 01:00:00",
                    "2018-04-01 00:00:00",
                    "2018-04-01 00:00:00",
                    "not a time",
                    "2018/4/1 1:00",
                ],
            ),
            Column::new("PM2.5".into(), vec![1.0, 2.0, 3.0, 4.0, 5.0]),
        ])
    }

    #[test]
    fn parses_known_layouts() {
        let expected = "2018-04-01 07:00:00";
        for raw in [
            "2018-04-01 07:00:00",
            "2018-04-01T07:00:00",
            "2018/04/01 07:00",
            "2018/4/1 7:00",
            " 2018-04-01 07:00 ",
        ] {
            assert_eq!(
                parse_utc_time(raw).map(|t| t.to_string()),
                Some(expected.to_string()),
                "{raw}"
            );
        }
        assert_eq!(parse_utc_time("yesterday"), None);
    }

    #[test]
    fn normalize_drops_and_counts_malformed_rows() -> Result<(), Box<dyn std::error::Error>> {
        let (df, dropped) = normalize_keys(raw_frame()?, "raw")?;
        assert_eq!(dropped, 2);
        assert_eq!(df.height(), 3);
        assert!(matches!(
            df.column(COL_UTC_TIME)?.dtype(),
            DataType::Datetime(TimeUnit::Milliseconds, None)
        ));
        Ok(())
    }

    #[test]
    fn dedup_keeps_first_occurrence_in_key_order() -> Result<(), Box<dyn std::error::Error>> {
        let (df, _) = normalize_keys(raw_frame()?, "raw")?;
        let (df, removed) = dedup_by_key(df)?;
        assert_eq!(removed, 1);
        assert_eq!(df.height(), 2);
        // 00:00 sorts first; of the two 01:00 rows the one read first (1.0) survives.
        assert_eq!(float_column(&df, "PM2.5")?, vec![Some(2.0), Some(1.0)]);
        let times: Vec<String> = time_millis(&df)?
            .into_iter()
            .filter_map(from_millis)
            .map(|t| t.to_string())
            .collect();
        assert_eq!(times, vec!["2018-04-01 00:00:00", "2018-04-01 01:00:00"]);
        Ok(())
    }

    #[test]
    fn missing_columns_are_a_schema_mismatch() -> Result<(), Box<dyn std::error::Error>> {
        let df = DataFrame::new(vec![Column::new("station_id".into(), vec!["BL0"])])?;
        match require_columns(&df, "labeled", &KEY_COLUMNS) {
            Err(DataError::SchemaMismatch { missing, .. }) => {
                assert_eq!(missing, vec!["utc_time".to_string()])
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
        Ok(())
    }
}
