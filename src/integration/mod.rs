//! The integration stage: raw historical and day-partitioned live files merged into one
//! keyed, coordinate-enriched table per data kind.

pub mod stations;

use crate::cache::manifest::{is_fresh, CacheKey};
use crate::cache::record_artifact;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::frames::error::DataError;
use crate::frames::io::{read_csv, write_csv};
use crate::frames::schema::{
    dedup_by_key, normalize_keys, require_columns, sort_by_key, COL_LATITUDE, COL_LONGITUDE,
    COL_STATION_ID, COL_UTC_TIME, KEY_COLUMNS,
};
use crate::integration::stations::StationDirectory;
use crate::report::StageReport;
use crate::types::data_kind::{City, DataKind};
use crate::utils::list_files_sorted;
use log::{debug, info, warn};
use polars::prelude::*;
use std::path::Path;

/// Positional column names of the historical air-quality export.
const HISTORICAL_AQ_COLUMNS: [&str; 5] = [COL_UTC_TIME, COL_STATION_ID, "PM2.5", "PM10", "NO2"];

/// Builds the merged historical air quality, live air quality and live grid tables.
pub fn integrate_all(config: &PipelineConfig) -> Result<StageReport, PipelineError> {
    let layout = config.layout();
    let mut report = StageReport::new("integration");

    let aq_stations = StationDirectory::load(&layout.aq_station_reference())?;
    let grid_stations = StationDirectory::load(&layout.grid_station_reference())?;
    for (name, directory) in [("air quality", &aq_stations), ("grid", &grid_stations)] {
        if directory.is_empty() {
            warn!("No {} stations in reference file, coordinates will be empty", name);
        } else {
            debug!("Loaded {} {} stations", directory.len(), name);
        }
    }

    let hist_upstream = layout.raw_historical_aq();
    let hist_artifact = layout.merged_historical_aq();
    if !hist_upstream.is_file() {
        return Err(DataError::MissingUpstreamFile(hist_upstream).into());
    }
    // Coordinates are baked into the artifact, so the station file is an upstream too.
    let aq_reference = layout.aq_station_reference();
    let key = CacheKey::of_upstreams(&[hist_upstream.as_path(), aq_reference.as_path()])?;
    if is_fresh(&hist_artifact, &key) {
        info!("Reusing {}", hist_artifact.display());
        report.files_reused += 1;
    } else {
        let raw = read_historical_aq(&hist_upstream)?;
        let mut merged = merge_readings(raw, DataKind::AirQuality, &aq_stations, &mut report)?;
        write_csv(&mut merged, &hist_artifact)?;
        report.wrote(merged.height());
        record_artifact(&merged, key, &hist_artifact)?;
    }

    let aq_dir = layout.raw_kind_dir(DataKind::AirQuality, City::London);
    let raw = read_live(&aq_dir, DataKind::AirQuality)?;
    let raw = keep_stations(raw, &config.stations)?;
    let mut merged = merge_readings(raw, DataKind::AirQuality, &aq_stations, &mut report)?;
    write_csv(&mut merged, &layout.merged_live_aq())?;
    report.wrote(merged.height());

    let grid_dir = layout.raw_kind_dir(DataKind::Grid, City::London);
    let raw = read_live(&grid_dir, DataKind::Grid)?;
    let mut merged = merge_readings(raw, DataKind::Grid, &grid_stations, &mut report)?;
    write_csv(&mut merged, &layout.merged_live_grid())?;
    report.wrote(merged.height());

    Ok(report)
}

/// Reads the historical export by position, with or without a leading index column.
pub fn read_historical_aq(path: &Path) -> Result<DataFrame, DataError> {
    let df = read_csv(path)?;
    rename_positional(df, &path.display().to_string(), &HISTORICAL_AQ_COLUMNS)
}

fn rename_positional(df: DataFrame, table: &str, names: &[&str]) -> Result<DataFrame, DataError> {
    let skip = match df.width() {
        w if w == names.len() => 0,
        w if w == names.len() + 1 => 1,
        found => {
            return Err(DataError::WidthMismatch {
                table: table.to_string(),
                expected: names.len(),
                found,
            })
        }
    };
    let columns: Vec<Column> = df.get_columns()[skip..]
        .iter()
        .zip(names)
        .map(|(column, name)| column.clone().with_name((*name).into()))
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Concatenates every day file of one live kind, renaming to the integrated columns.
///
/// Files are read in name order. Station and time are read as text and measurements as
/// float so that header-only files concatenate with populated ones.
pub fn read_live(dir: &Path, kind: DataKind) -> Result<DataFrame, DataError> {
    let files = list_files_sorted(dir)?;
    if files.is_empty() {
        return Err(DataError::EmptyUpstreamDir(dir.to_path_buf()));
    }
    let mapping = kind.live_column_mapping();
    let sources: Vec<&str> = mapping.iter().map(|(from, _)| *from).collect();

    let mut parts = Vec::with_capacity(files.len());
    for file in &files {
        let df = read_csv(file)?;
        require_columns(&df, &file.display().to_string(), &sources)?;
        let selection: Vec<Expr> = mapping
            .iter()
            .map(|(from, to)| {
                let dtype = if KEY_COLUMNS.contains(to) {
                    DataType::String
                } else {
                    DataType::Float64
                };
                col(*from).cast(dtype).alias(*to)
            })
            .collect();
        parts.push(df.lazy().select(selection));
    }
    info!("Concatenating {} {} files from {}", parts.len(), kind, dir.display());
    Ok(concat(&parts, UnionArgs::default())?.collect()?)
}

fn keep_stations(df: DataFrame, stations: &[String]) -> Result<DataFrame, DataError> {
    let keep: Vec<bool> = df
        .column(COL_STATION_ID)?
        .cast(&DataType::String)?
        .str()?
        .into_iter()
        .map(|id| id.is_some_and(|id| stations.iter().any(|s| s == id)))
        .collect();
    Ok(df.filter(&BooleanChunked::from_slice("keep".into(), &keep))?)
}

/// Cleans raw readings and adds station coordinates.
///
/// Missing measurements become 0.0, malformed keys are dropped, the first reading of
/// each key is kept and the result is ordered by key with columns
/// `station_id, utc_time, longitude, latitude, <measurements>`.
pub fn merge_readings(
    raw: DataFrame,
    kind: DataKind,
    directory: &StationDirectory,
    report: &mut StageReport,
) -> Result<DataFrame, DataError> {
    let table = format!("{} readings", kind);
    let measurements = kind.measurement_columns();
    let mut required = KEY_COLUMNS.to_vec();
    required.extend(measurements);
    require_columns(&raw, &table, &required)?;

    let (df, dropped) = normalize_keys(raw, &table)?;
    report.record_malformed(table, dropped);

    let filled: Vec<Expr> = measurements
        .iter()
        .map(|m| col(*m).cast(DataType::Float64).fill_null(lit(0.0)))
        .collect();
    let df = df.lazy().with_columns(filled).collect()?;

    let (df, duplicates) = dedup_by_key(df)?;
    if duplicates > 0 {
        debug!("Dropped {} duplicate {} readings", duplicates, kind);
    }

    let df = directory.attach(df, report)?;
    let mut output: Vec<Expr> = [COL_STATION_ID, COL_UTC_TIME, COL_LONGITUDE, COL_LATITUDE]
        .into_iter()
        .map(col)
        .collect();
    output.extend(measurements.iter().map(|m| col(*m)));
    sort_by_key(df.lazy().select(output).collect()?)
}
