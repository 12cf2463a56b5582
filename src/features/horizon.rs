//! Placeholder rows for the forecast days.

use crate::frames::error::DataError;
use crate::frames::schema::{
    datetime_column, sort_by_key, station_ids, time_millis, to_millis, COL_STATION_ID,
    COL_UTC_TIME,
};
use crate::types::horizon::ForecastHorizon;
use log::debug;
use polars::prelude::*;
use std::collections::{BTreeSet, HashSet};

/// Adds a value-less row for every station and horizon hour not already present.
///
/// Every non-key column of a placeholder row is null. The result is sorted by
/// (station_id, utc_time), so placeholders sit chronologically after each station's
/// observations. Returns the extended table and the number of rows added.
pub fn extend_with_horizon(
    df: DataFrame,
    horizon: &ForecastHorizon,
) -> Result<(DataFrame, usize), DataError> {
    let stations = station_ids(&df)?;
    let times = time_millis(&df)?;
    let existing: HashSet<(&str, i64)> = stations
        .iter()
        .map(String::as_str)
        .zip(times.iter().copied())
        .collect();
    let known: BTreeSet<&str> = stations.iter().map(String::as_str).collect();
    let hours: Vec<i64> = horizon.hours().into_iter().map(to_millis).collect();

    let mut new_stations = Vec::new();
    let mut new_times = Vec::new();
    for station in &known {
        for hour in &hours {
            if !existing.contains(&(*station, *hour)) {
                new_stations.push(station.to_string());
                new_times.push(Some(*hour));
            }
        }
    }
    let added = new_stations.len();
    debug!(
        "Adding {} horizon rows for {} stations ({})",
        added,
        known.len(),
        horizon
    );
    if added == 0 {
        return Ok((sort_by_key(df)?, 0));
    }

    let mut placeholder_columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let placeholder = match column.name().as_str() {
            COL_STATION_ID => Column::new(COL_STATION_ID.into(), new_stations.clone()),
            COL_UTC_TIME => datetime_column(COL_UTC_TIME, new_times.clone())?,
            _ => Column::full_null(column.name().clone(), added, column.dtype()),
        };
        placeholder_columns.push(placeholder);
    }
    let placeholders = DataFrame::new(placeholder_columns)?;

    let extended = df.vstack(&placeholders)?;
    Ok((sort_by_key(extended)?, added))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::schema::{float_column, from_millis};

    fn observed(horizon: &ForecastHorizon) -> Result<DataFrame, Box<dyn std::error::Error>> {
        // BL0 already has a reading at the first horizon hour.
        let first_hour = to_millis(horizon.start());
        let earlier = first_hour - 3_600_000;
        Ok(DataFrame::new(vec![
            Column::new(COL_STATION_ID.into(), vec!["BL0", "BL0", "CD1"]),
            datetime_column(
                COL_UTC_TIME,
                vec![Some(earlier), Some(first_hour), Some(earlier)],
            )?,
            Column::new("PM2.5".into(), vec![Some(3.0), Some(4.0), Some(5.0)]),
        ])?)
    }

    #[test]
    fn adds_48_rows_per_station_without_duplicates() -> Result<(), Box<dyn std::error::Error>> {
        let horizon = ForecastHorizon::new("2018-05-01", "2018-05-02")?;
        let (df, added) = extend_with_horizon(observed(&horizon)?, &horizon)?;

        assert_eq!(added, 47 + 48);
        assert_eq!(df.height(), 3 + 95);

        let stations = station_ids(&df)?;
        let times = time_millis(&df)?;
        let bl0_rows = stations.iter().filter(|s| *s == "BL0").count();
        assert_eq!(bl0_rows, 1 + 48);
        // Observed value kept at the shared key.
        assert_eq!(float_column(&df, "PM2.5")?[1], Some(4.0));
        assert_eq!(float_column(&df, "PM2.5")?[2], None);
        // Chronological within each station.
        assert!(times[..bl0_rows].windows(2).all(|w| w[0] < w[1]));
        assert_eq!(
            from_millis(times[df.height() - 1]).map(|t| t.to_string()),
            Some("2018-05-02 23:00:00".to_string())
        );
        Ok(())
    }

    #[test]
    fn empty_table_stays_empty() -> Result<(), Box<dyn std::error::Error>> {
        let horizon = ForecastHorizon::new("2018-05-01", "2018-05-02")?;
        let df = observed(&horizon)?.head(Some(0));
        let (df, added) = extend_with_horizon(df, &horizon)?;
        assert_eq!((df.height(), added), (0, 0));
        Ok(())
    }
}
