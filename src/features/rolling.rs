//! Trailing, time-based rolling statistics over one pollutant per station.
//!
//! A window of span `w` ending at row `t` holds every reading of the same station whose
//! timestamp lies in `(t - w, t]`. Windows at the start of a series are partial and use
//! whatever history exists.
//!
//! Readings at or below zero are placeholders for missing measurements and are left out
//! of mean, std, median and min. Max still sees them; see [`WindowStats::compute`].

use crate::frames::error::DataError;
use crate::frames::schema::{float_column, sort_by_key, station_ids, time_millis};
use crate::types::target::Target;
use chrono::Duration;
use polars::prelude::*;

/// A trailing window such as `1d`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingWindow {
    pub name: String,
    pub span: Duration,
}

impl RollingWindow {
    pub fn days(days: i64) -> Self {
        Self {
            name: format!("{days}d"),
            span: Duration::days(days),
        }
    }

    /// 1, 2 and 3 day windows.
    pub fn defaults() -> Vec<Self> {
        (1..=3).map(Self::days).collect()
    }

    fn span_millis(&self) -> i64 {
        self.span.num_milliseconds()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollingStat {
    Mean,
    Std,
    Median,
    Max,
    Min,
}

impl RollingStat {
    pub const ALL: [RollingStat; 5] = [
        RollingStat::Mean,
        RollingStat::Std,
        RollingStat::Median,
        RollingStat::Max,
        RollingStat::Min,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RollingStat::Mean => "mean",
            RollingStat::Std => "std",
            RollingStat::Median => "median",
            RollingStat::Max => "max",
            RollingStat::Min => "min",
        }
    }
}

/// `PM2.5_1d_mean` and friends.
pub fn feature_column(target: Target, window: &RollingWindow, stat: RollingStat) -> String {
    format!("{}_{}_{}", target.column(), window.name, stat.name())
}

/// Statistics of a single window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowStats {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
    pub min: Option<f64>,
}

impl WindowStats {
    /// Computes the statistics of one window's values.
    ///
    /// Mean, std, median and min use strictly positive values only. Max uses every
    /// present value, so a window holding only zero placeholders has a max of 0 and
    /// no other statistic. Std is the sample deviation and needs two values.
    pub fn compute(values: &[Option<f64>]) -> Self {
        Self::compute_with(values, &mut Vec::new())
    }

    /// [`WindowStats::compute`] using `scratch` as the buffer for positive values.
    fn compute_with(values: &[Option<f64>], scratch: &mut Vec<f64>) -> Self {
        let max = values
            .iter()
            .flatten()
            .copied()
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));

        scratch.clear();
        scratch.extend(values.iter().flatten().copied().filter(|v| *v > 0.0));
        if scratch.is_empty() {
            return Self {
                max,
                ..Self::default()
            };
        }
        scratch.sort_unstable_by(|a, b| a.total_cmp(b));

        let n = scratch.len();
        let mean = scratch.iter().sum::<f64>() / n as f64;
        let std = (n > 1).then(|| {
            let sum_sq: f64 = scratch.iter().map(|v| (v - mean).powi(2)).sum();
            (sum_sq / (n - 1) as f64).sqrt()
        });
        let median = if n % 2 == 1 {
            scratch[n / 2]
        } else {
            (scratch[n / 2 - 1] + scratch[n / 2]) / 2.0
        };

        Self {
            mean: Some(mean),
            std,
            median: Some(median),
            max,
            min: scratch.first().copied(),
        }
    }

    pub fn get(&self, stat: RollingStat) -> Option<f64> {
        match stat {
            RollingStat::Mean => self.mean,
            RollingStat::Std => self.std,
            RollingStat::Median => self.median,
            RollingStat::Max => self.max,
            RollingStat::Min => self.min,
        }
    }
}

/// Rolling statistics for one station's series.
///
/// `times` are epoch milliseconds in ascending order, aligned with `values`.
pub fn rolling_series(
    times: &[i64],
    values: &[Option<f64>],
    window: &RollingWindow,
) -> Vec<WindowStats> {
    let span = window.span_millis();
    let mut start = 0;
    let mut scratch = Vec::new();
    times
        .iter()
        .enumerate()
        .map(|(i, t)| {
            while times[start] <= t - span {
                start += 1;
            }
            WindowStats::compute_with(&values[start..=i], &mut scratch)
        })
        .collect()
}

/// Appends the rolling statistics of `target` to a keyed table.
///
/// The table is sorted by (station_id, utc_time) and must hold at most one row per key.
/// Returns the sorted table with one extra column per window and statistic.
pub fn rolling_features(
    df: DataFrame,
    target: Target,
    windows: &[RollingWindow],
) -> Result<DataFrame, DataError> {
    let mut df = sort_by_key(df)?;
    let stations = station_ids(&df)?;
    let times = time_millis(&df)?;
    let values = float_column(&df, target.column())?;

    let runs = station_runs(&stations);
    for window in windows {
        let mut stats = Vec::with_capacity(df.height());
        for range in &runs {
            stats.extend(rolling_series(
                &times[range.clone()],
                &values[range.clone()],
                window,
            ));
        }
        for stat in RollingStat::ALL {
            let column: Vec<Option<f64>> = stats.iter().map(|s| s.get(stat)).collect();
            df.with_column(Column::new(
                feature_column(target, window, stat).into(),
                column,
            ))?;
        }
    }
    Ok(df)
}

/// Contiguous index ranges sharing a station id, for a table sorted by station.
pub(crate) fn station_runs(stations: &[String]) -> Vec<std::ops::Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=stations.len() {
        if i == stations.len() || stations[i] != stations[start] {
            runs.push(start..i);
            start = i;
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::schema::{datetime_column, COL_STATION_ID, COL_UTC_TIME};

    const HOUR: i64 = 3_600_000;

    fn hours(n: i64) -> Vec<i64> {
        (0..n).map(|h| h * HOUR).collect()
    }

    #[test]
    fn one_day_mean_covers_trailing_24_hours() {
        // 26 hourly readings valued 1..=26; at hour 25 the window is (1h, 25h].
        let times = hours(26);
        let values: Vec<Option<f64>> = (1..=26).map(|v| Some(v as f64)).collect();
        let stats = rolling_series(&times, &values, &RollingWindow::days(1));

        assert_eq!(stats[0].mean, Some(1.0));
        assert_eq!(stats[0].std, None, "single value has no sample std");
        let expected: f64 = (3..=26).sum::<i32>() as f64 / 24.0;
        assert_eq!(stats[25].mean, Some(expected));
        assert_eq!(stats[25].min, Some(3.0));
        assert_eq!(stats[25].max, Some(26.0));
    }

    #[test]
    fn non_positive_values_only_reach_max() {
        let times = hours(3);
        let values = vec![Some(0.0), Some(-1.0), None];
        let stats = rolling_series(&times, &values, &RollingWindow::days(1));
        let last = stats[2];
        assert_eq!(last.max, Some(0.0));
        assert_eq!(last.mean, None);
        assert_eq!(last.median, None);
        assert_eq!(last.min, None);
        assert_eq!(last.std, None);
    }

    #[test]
    fn median_and_sample_std() {
        let stats = WindowStats::compute(&[Some(2.0), Some(4.0), Some(0.0), Some(6.0), Some(8.0)]);
        assert_eq!(stats.median, Some(5.0));
        assert_eq!(stats.mean, Some(5.0));
        // (9 + 1 + 1 + 9) / 3
        assert!((stats.std.unwrap() - (20.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.min, Some(2.0));
        assert_eq!(stats.max, Some(8.0));
    }

    #[test]
    fn gaps_shrink_the_window() {
        // A reading two days earlier falls outside the 1d window but inside 3d.
        let times = vec![0, 48 * HOUR, 49 * HOUR];
        let values = vec![Some(10.0), Some(2.0), None];
        let one_day = rolling_series(&times, &values, &RollingWindow::days(1));
        let three_day = rolling_series(&times, &values, &RollingWindow::days(3));
        assert_eq!(one_day[2].mean, Some(2.0));
        assert_eq!(three_day[2].mean, Some(6.0));
    }

    #[test]
    fn shared_buffer_matches_fresh_windows() {
        // Irregular series: every fifth hour missing, mixed placeholders and gaps.
        let times: Vec<i64> = (0..200).filter(|h| h % 5 != 0).map(|h| h * HOUR).collect();
        let values: Vec<Option<f64>> = (0..times.len())
            .map(|i| match i % 7 {
                0 => None,
                1 => Some(0.0),
                _ => Some((i % 13) as f64),
            })
            .collect();
        let window = RollingWindow::days(1);
        let stats = rolling_series(&times, &values, &window);

        for (i, t) in times.iter().enumerate() {
            let start = times.iter().position(|s| *s > t - window.span_millis()).unwrap();
            assert_eq!(stats[i], WindowStats::compute(&values[start..=i]), "row {i}");
        }
    }

    #[test]
    fn frame_gets_fifteen_columns_per_station() -> Result<(), Box<dyn std::error::Error>> {
        let millis: Vec<Option<i64>> = [0, HOUR, 0, HOUR].into_iter().map(Some).collect();
        let df = DataFrame::new(vec![
            Column::new(COL_STATION_ID.into(), vec!["CD1", "CD1", "BL0", "BL0"]),
            datetime_column(COL_UTC_TIME, millis)?,
            Column::new("PM2.5".into(), vec![Some(4.0), Some(6.0), Some(1.0), None]),
        ])?;

        let out = rolling_features(df, Target::Pm25, &RollingWindow::defaults())?;
        assert_eq!(out.width(), 3 + 15);
        let mean = out.column("PM2.5_1d_mean")?.f64()?;
        // BL0 sorts first; stations never share a window.
        assert_eq!(mean.get(0), Some(1.0));
        assert_eq!(mean.get(1), Some(1.0));
        assert_eq!(mean.get(2), Some(4.0));
        assert_eq!(mean.get(3), Some(5.0));
        Ok(())
    }

    #[test]
    fn runs_split_on_station_change() {
        let ids: Vec<String> = ["a", "a", "b", "c", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(station_runs(&ids), vec![0..2, 2..3, 3..5]);
        assert!(station_runs(&[]).is_empty());
    }
}
