//! The feature stage: rolling and calendar features for every target, split at the
//! forecast horizon.

pub mod calendar;
pub mod horizon;
pub mod merge;
pub mod rolling;

use crate::config::{PipelineConfig, Source, Split};
use crate::error::PipelineError;
use crate::features::calendar::{calendar_features, CALENDAR_COLUMNS};
use crate::features::horizon::extend_with_horizon;
use crate::features::merge::{merge_features, split_at_horizon};
use crate::features::rolling::rolling_features;
use crate::frames::io::{read_csv, write_csv};
use crate::frames::schema::{
    dedup_by_key, normalize_keys, require_columns, COL_STATION_ID, COL_UTC_TIME,
};
use crate::report::StageReport;
use crate::types::horizon::ForecastHorizon;
use crate::types::target::Target;
use log::info;
use polars::prelude::*;

pub const DATETIME_FEATURES_FILE: &str = "datetime_features.csv";
pub const AIR_QUALITY_FEATURES_FILE: &str = "air_quality_features.csv";
pub const ALL_FEATURES_FILE: &str = "all_features.csv";

/// Builds and writes the feature files of every target.
pub fn generate_features(
    config: &PipelineConfig,
    horizon: &ForecastHorizon,
) -> Result<StageReport, PipelineError> {
    let mut report = StageReport::new("features");
    for target in Target::ALL {
        info!("Generating {} features for horizon {}", target, horizon);
        generate_target_features(config, horizon, target, &mut report)?;
    }
    Ok(report)
}

fn generate_target_features(
    config: &PipelineConfig,
    horizon: &ForecastHorizon,
    target: Target,
    report: &mut StageReport,
) -> Result<(), PipelineError> {
    let series = load_labeled_series(config, target, report)?;
    let (extended, added) = extend_with_horizon(series, horizon)?;
    info!("{}: {} rows after adding {} horizon rows", target, extended.height(), added);

    let label = target.label_column();
    let datetime = calendar_features(extended.select([COL_STATION_ID, COL_UTC_TIME, label.as_str()])?)?;
    let air_quality = rolling_features(extended, target, &config.windows)?;
    let all = merge_features(&air_quality, &datetime)?;

    let layout = config.layout();
    for (name, table) in [
        (DATETIME_FEATURES_FILE, &datetime),
        (AIR_QUALITY_FEATURES_FILE, &air_quality),
        (ALL_FEATURES_FILE, &all),
    ] {
        let split = split_at_horizon(table, horizon)?;
        for (which, mut df) in [(Split::Train, split.train), (Split::Test, split.test)] {
            write_csv(&mut df, &layout.feature_file(which, target, name))?;
            report.wrote(df.height());
        }
    }
    Ok(())
}

/// Historical and live labeled readings of one target, deduplicated on key.
///
/// Only the key, the target and its label are kept, both cast to float.
fn load_labeled_series(
    config: &PipelineConfig,
    target: Target,
    report: &mut StageReport,
) -> Result<DataFrame, PipelineError> {
    let layout = config.layout();
    let label = target.label_column();
    let required = [COL_STATION_ID, COL_UTC_TIME, target.column(), label.as_str()];

    let mut parts = Vec::with_capacity(2);
    for source in [Source::Historical, Source::Live] {
        let path = layout.labeled(target, source);
        let table = path.display().to_string();
        let df = read_csv(&path)?;
        require_columns(&df, &table, &required)?;
        let (df, dropped) = normalize_keys(df, &table)?;
        report.record_malformed(table, dropped);
        parts.push(
            df.lazy().select([
                col(COL_STATION_ID),
                col(COL_UTC_TIME),
                col(target.column()).cast(DataType::Float64),
                col(label.as_str()).cast(DataType::Float64),
            ]),
        );
    }

    let combined = concat(&parts, UnionArgs::default())?.collect()?;
    let (deduped, removed) = dedup_by_key(combined)?;
    if removed > 0 {
        info!("{}: dropped {} rows present in both historical and live data", target, removed);
    }
    Ok(deduped)
}

/// Names of the calendar columns in the datetime feature files.
pub fn datetime_feature_columns(target: Target) -> Vec<String> {
    let mut columns = vec![
        COL_STATION_ID.to_string(),
        COL_UTC_TIME.to_string(),
        target.label_column(),
    ];
    columns.extend(CALENDAR_COLUMNS.iter().map(|c| c.to_string()));
    columns
}
