use crate::features::calendar::CALENDAR_COLUMNS;
use crate::frames::error::DataError;
use crate::frames::filtering::TimeFrameFilterExt;
use crate::frames::schema::{require_columns, KEY_COLUMNS};
use crate::types::horizon::ForecastHorizon;
use polars::prelude::*;

/// A feature table cut at the start of the forecast horizon.
#[derive(Debug, Clone)]
pub struct FeatureSplit {
    /// Rows strictly before the first horizon day.
    pub train: DataFrame,
    /// Rows from the first horizon day on.
    pub test: DataFrame,
}

/// Splits a keyed table into train and test rows, each sorted by key.
pub fn split_at_horizon(df: &DataFrame, horizon: &ForecastHorizon) -> Result<FeatureSplit, DataError> {
    let sorted = df.clone().lazy().sort(
        KEY_COLUMNS,
        SortMultipleOptions::default().with_maintain_order(true),
    );
    Ok(FeatureSplit {
        train: sorted.clone().filter_before(horizon.start()).collect()?,
        test: sorted.filter_from(horizon.start()).collect()?,
    })
}

/// Inner-joins rolling features with calendar features on (station_id, utc_time).
///
/// Only the key and calendar columns are taken from `calendar`; everything else comes
/// from `rolling`. Keys present on one side only are dropped.
pub fn merge_features(rolling: &DataFrame, calendar: &DataFrame) -> Result<DataFrame, DataError> {
    require_columns(rolling, "rolling features", &KEY_COLUMNS)?;
    let mut calendar_side = KEY_COLUMNS.to_vec();
    calendar_side.extend(CALENDAR_COLUMNS);
    require_columns(calendar, "calendar features", &calendar_side)?;

    let keys: Vec<Expr> = KEY_COLUMNS.iter().map(|name| col(*name)).collect();
    let merged = rolling
        .clone()
        .lazy()
        .join(
            calendar
                .clone()
                .lazy()
                .select(calendar_side.iter().map(|name| col(*name)).collect::<Vec<_>>()),
            keys.clone(),
            keys,
            JoinArgs::new(JoinType::Inner),
        )
        .sort(
            KEY_COLUMNS,
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;
    Ok(merged)
}
