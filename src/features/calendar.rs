//! Calendar fields derived from a reading's timestamp.

use crate::frames::error::DataError;
use crate::frames::schema::{from_millis, time_millis};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use polars::prelude::*;

pub const CALENDAR_COLUMNS: [&str; 6] = [
    "month_of_year",
    "week_of_year",
    "week_of_month",
    "day_of_month",
    "day_of_week",
    "hour_of_day",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    pub month_of_year: u32,
    /// ISO week number.
    pub week_of_year: u32,
    pub week_of_month: u32,
    pub day_of_month: u32,
    /// 0 is Monday.
    pub day_of_week: u32,
    pub hour_of_day: u32,
}

impl CalendarFeatures {
    pub fn of(time: NaiveDateTime) -> Self {
        let date = time.date();
        Self {
            month_of_year: date.month(),
            week_of_year: date.iso_week().week(),
            week_of_month: week_of_month(date),
            day_of_month: date.day(),
            day_of_week: date.weekday().num_days_from_monday(),
            hour_of_day: time.hour(),
        }
    }

    fn values(&self) -> [u32; 6] {
        [
            self.month_of_year,
            self.week_of_year,
            self.week_of_month,
            self.day_of_month,
            self.day_of_week,
            self.hour_of_day,
        ]
    }
}

/// Week of the month counted in Monday-started rows of a calendar page (1 to 6).
pub fn week_of_month(date: NaiveDate) -> u32 {
    let first_weekday = date
        .with_day(1)
        .map(|first| first.weekday().num_days_from_monday())
        .unwrap_or_default();
    (date.day() + first_weekday).div_ceil(7)
}

/// Appends the six calendar columns to a table with a normalized `utc_time` column.
pub fn calendar_features(mut df: DataFrame) -> Result<DataFrame, DataError> {
    let features: Vec<Option<[u32; 6]>> = time_millis(&df)?
        .into_iter()
        .map(|ms| from_millis(ms).map(|t| CalendarFeatures::of(t).values()))
        .collect();

    for (i, name) in CALENDAR_COLUMNS.iter().enumerate() {
        let column: Vec<Option<i32>> = features
            .iter()
            .map(|f| f.map(|values| values[i] as i32))
            .collect();
        df.with_column(Column::new((*name).into(), column))?;
    }
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::schema::{datetime_column, to_millis, COL_UTC_TIME};

    fn at(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn week_of_month_starts_on_monday_rows() {
        // January 2018 starts on a Monday.
        let monday = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        assert_eq!(week_of_month(monday), 1);
        assert_eq!(week_of_month(NaiveDate::from_ymd_opt(2018, 1, 8).unwrap()), 2);
        // April 2018 starts on a Sunday, so the 2nd is already in week 2.
        assert_eq!(week_of_month(NaiveDate::from_ymd_opt(2018, 4, 1).unwrap()), 1);
        assert_eq!(week_of_month(NaiveDate::from_ymd_opt(2018, 4, 2).unwrap()), 2);
        assert_eq!(week_of_month(NaiveDate::from_ymd_opt(2018, 4, 30).unwrap()), 6);
    }

    #[test]
    fn fields_of_a_known_timestamp() {
        let features = CalendarFeatures::of(at("2018-05-02 07:00:00"));
        assert_eq!(
            features,
            CalendarFeatures {
                month_of_year: 5,
                week_of_year: 18,
                week_of_month: 1,
                day_of_month: 2,
                day_of_week: 2,
                hour_of_day: 7,
            }
        );
    }

    #[test]
    fn iso_week_at_year_boundary() {
        // 2018-12-31 is a Monday in ISO week 1 of 2019.
        assert_eq!(CalendarFeatures::of(at("2018-12-31 00:00:00")).week_of_year, 1);
    }

    #[test]
    fn appends_six_columns() -> Result<(), Box<dyn std::error::Error>> {
        let df = DataFrame::new(vec![datetime_column(
            COL_UTC_TIME,
            vec![Some(to_millis(at("2018-04-01 23:00:00")))],
        )?])?;
        let out = calendar_features(df)?;
        assert_eq!(out.width(), 7);
        assert_eq!(out.column("day_of_week")?.i32()?.get(0), Some(6));
        assert_eq!(out.column("hour_of_day")?.i32()?.get(0), Some(23));
        Ok(())
    }
}
