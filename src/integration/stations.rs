//! Station reference tables: static coordinates keyed by station id.

use crate::frames::error::DataError;
use crate::frames::io::read_csv;
use crate::frames::schema::{column_names, COL_LATITUDE, COL_LONGITUDE, COL_STATION_ID};
use crate::report::{RecoverableIssue, StageReport};
use polars::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Coordinates of every station listed in one reference file.
#[derive(Debug, Clone)]
pub struct StationDirectory {
    source: PathBuf,
    /// station_id, latitude, longitude; one row per id.
    table: DataFrame,
}

impl StationDirectory {
    /// Loads a reference file whose first column is the station id.
    ///
    /// Latitude and longitude columns are found by name, ignoring case. Repeated ids
    /// keep their first row.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let df = read_csv(path)?;
        let table = path.display().to_string();
        let names = column_names(&df);
        let find = |wanted: &str| -> Result<String, DataError> {
            names
                .iter()
                .find(|name| name.trim().eq_ignore_ascii_case(wanted))
                .cloned()
                .ok_or_else(|| DataError::SchemaMismatch {
                    table: table.clone(),
                    missing: vec![wanted.to_string()],
                    found: names.clone(),
                })
        };
        let latitude = find(COL_LATITUDE)?;
        let longitude = find(COL_LONGITUDE)?;
        let id = df
            .get_columns()
            .first()
            .ok_or_else(|| DataError::WidthMismatch {
                table: table.clone(),
                expected: 3,
                found: 0,
            })?
            .cast(&DataType::String)?
            .with_name(COL_STATION_ID.into());

        let table = DataFrame::new(vec![
            id,
            df.column(&latitude)?
                .cast(&DataType::Float64)?
                .with_name(COL_LATITUDE.into()),
            df.column(&longitude)?
                .cast(&DataType::Float64)?
                .with_name(COL_LONGITUDE.into()),
        ])?;

        let mut seen = HashSet::new();
        let keep: Vec<bool> = table
            .column(COL_STATION_ID)?
            .str()?
            .into_iter()
            .map(|id| id.is_some_and(|id| seen.insert(id.to_string())))
            .collect();
        let table = table.filter(&BooleanChunked::from_slice("keep".into(), &keep))?;

        Ok(Self {
            source: path.to_path_buf(),
            table,
        })
    }

    pub fn len(&self) -> usize {
        self.table.height()
    }

    pub fn is_empty(&self) -> bool {
        self.table.height() == 0
    }

    /// Left-joins latitude and longitude onto a keyed table.
    ///
    /// Stations missing from the directory keep empty coordinates and are recorded as
    /// [`RecoverableIssue::JoinKeyUnmatched`], once per station.
    pub fn attach(&self, df: DataFrame, report: &mut StageReport) -> Result<DataFrame, DataError> {
        let known: HashSet<&str> = self
            .table
            .column(COL_STATION_ID)?
            .str()?
            .into_iter()
            .flatten()
            .collect();
        let stations: BTreeSet<String> = df
            .column(COL_STATION_ID)?
            .str()?
            .into_iter()
            .flatten()
            .filter(|id| !known.contains(id))
            .map(str::to_string)
            .collect();
        for station in stations {
            report.record(RecoverableIssue::JoinKeyUnmatched {
                station,
                reference: self.source.clone(),
            });
        }

        Ok(df
            .lazy()
            .join(
                self.table.clone().lazy(),
                [col(COL_STATION_ID)],
                [col(COL_STATION_ID)],
                JoinArgs::new(JoinType::Left),
            )
            .collect()?)
    }
}
