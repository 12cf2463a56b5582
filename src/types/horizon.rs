//! The forecast horizon: the two days whose hourly values are being predicted.

use crate::error::PipelineError;
use crate::types::any_date::AnyDate;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// Hours synthesized per horizon day.
pub const HOURS_PER_DAY: u32 = 24;

/// The pair of forecast days.
///
/// Rows for these days carry no observation; they only receive rolling and calendar
/// features. Everything timestamped before [`ForecastHorizon::start`] is training data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastHorizon {
    first: NaiveDate,
    second: NaiveDate,
}

impl ForecastHorizon {
    /// Creates a horizon from two distinct days, in any order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DateParsing`] if either value cannot be resolved to a date,
    /// and [`PipelineError::InvalidHorizon`] if both resolve to the same day.
    pub fn new(
        first: impl AnyDate + fmt::Debug + Clone,
        second: impl AnyDate + fmt::Debug + Clone,
    ) -> Result<Self, PipelineError> {
        let first_day = first
            .clone()
            .get_date()
            .ok_or_else(|| PipelineError::DateParsing(format!("{:?}", first)))?;
        let second_day = second
            .clone()
            .get_date()
            .ok_or_else(|| PipelineError::DateParsing(format!("{:?}", second)))?;
        if first_day == second_day {
            return Err(PipelineError::InvalidHorizon(first_day));
        }
        Ok(Self {
            first: first_day.min(second_day),
            second: first_day.max(second_day),
        })
    }

    /// The default horizon: the day after `today` and the day after that.
    pub fn following(today: NaiveDate) -> Self {
        Self {
            first: today + Duration::days(1),
            second: today + Duration::days(2),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn second_day(&self) -> NaiveDate {
        self.second
    }

    /// Midnight of the first horizon day; the train/test boundary.
    pub fn start(&self) -> NaiveDateTime {
        self.first.and_time(NaiveTime::MIN)
    }

    /// Every horizon timestamp, in chronological order (24 per day).
    pub fn hours(&self) -> Vec<NaiveDateTime> {
        [self.first, self.second]
            .iter()
            .flat_map(|day| {
                let midnight = day.and_time(NaiveTime::MIN);
                (0..HOURS_PER_DAY).map(move |h| midnight + Duration::hours(h as i64))
            })
            .collect()
    }
}

impl fmt::Display for ForecastHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.first, self.second)
    }
}
