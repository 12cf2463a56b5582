use crate::frames::schema::{to_millis, COL_UTC_TIME};
use chrono::NaiveDateTime;
use polars::prelude::{col, lit, DataType, LazyFrame};

pub trait TimeFrameFilterExt {
    /// Keeps rows whose `utc_time` is strictly before `boundary`.
    ///
    /// # Returns
    /// A new `LazyFrame` with the filter applied. Type errors surface on `collect`.
    fn filter_before(self, boundary: NaiveDateTime) -> LazyFrame;

    /// Keeps rows whose `utc_time` is at or after `boundary`.
    fn filter_from(self, boundary: NaiveDateTime) -> LazyFrame;
}

impl TimeFrameFilterExt for LazyFrame {
    fn filter_before(self, boundary: NaiveDateTime) -> LazyFrame {
        // Compare on epoch milliseconds so the literal's time unit never matters
        self.filter(
            col(COL_UTC_TIME)
                .cast(DataType::Int64)
                .lt(lit(to_millis(boundary))),
        )
    }

    fn filter_from(self, boundary: NaiveDateTime) -> LazyFrame {
        self.filter(
            col(COL_UTC_TIME)
                .cast(DataType::Int64)
                .gt_eq(lit(to_millis(boundary))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::schema::datetime_column;
    use polars::prelude::*;

    #[test]
    fn splits_on_boundary() -> Result<(), Box<dyn std::error::Error>> {
        let base = NaiveDateTime::parse_from_str("2018-05-01 00:00:00", "%Y-%m-%d %H:%M:%S")?;
        let millis: Vec<Option<i64>> = (-2..2)
            .map(|h| Some(to_millis(base + chrono::Duration::hours(h))))
            .collect();
        let df = DataFrame::new(vec![
            Column::new("station_id".into(), vec!["BL0"; 4]),
            datetime_column(COL_UTC_TIME, millis)?,
        ])?;

        let before = df.clone().lazy().filter_before(base).collect()?;
        let from = df.lazy().filter_from(base).collect()?;
        assert_eq!(before.height(), 2);
        assert_eq!(from.height(), 2);
        Ok(())
    }
}
