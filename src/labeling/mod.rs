//! Attaching next-hour labels to merged air-quality readings.

use crate::cache::manifest::{is_fresh, CacheKey};
use crate::cache::record_artifact;
use crate::config::{PipelineConfig, Source};
use crate::error::PipelineError;
use crate::features::rolling::station_runs;
use crate::frames::error::DataError;
use crate::frames::io::{read_csv, write_csv};
use crate::frames::schema::{
    float_column, normalize_keys, require_columns, sort_by_key, station_ids, time_millis,
    COL_STATION_ID, COL_UTC_TIME,
};
use crate::report::StageReport;
use crate::types::target::Target;
use log::info;
use polars::prelude::*;
use std::path::Path;

const HOUR_MILLIS: i64 = 3_600_000;

/// Labels one station's series with the value `offset` rows ahead.
///
/// `times` are ascending epoch milliseconds aligned with `values`. Row `i` is labeled
/// only when rows `i..=i + offset` are consecutive hours; the last `offset` rows and
/// rows followed by a gap stay unlabeled. A missing value ahead gives a missing label.
pub fn label_series(times: &[i64], values: &[Option<f64>], offset: usize) -> Vec<Option<f64>> {
    (0..times.len())
        .map(|i| {
            let ahead = i + offset;
            if offset == 0 || ahead >= times.len() {
                return None;
            }
            let contiguous = times[i..=ahead].windows(2).all(|w| w[1] - w[0] == HOUR_MILLIS);
            if contiguous {
                values[ahead]
            } else {
                None
            }
        })
        .collect()
}

/// Sorts a keyed table and appends the `<target>_label` column, keeping every row.
pub fn label_frame(df: DataFrame, target: Target, offset: usize) -> Result<DataFrame, DataError> {
    let mut df = sort_by_key(df)?;
    let stations = station_ids(&df)?;
    let times = time_millis(&df)?;
    let values = float_column(&df, target.column())?;

    let mut labels = Vec::with_capacity(df.height());
    for run in station_runs(&stations) {
        labels.extend(label_series(&times[run.clone()], &values[run], offset));
    }
    df.with_column(Column::new(target.label_column().into(), labels))?;
    Ok(df)
}

/// Labels every target's historical and live readings.
///
/// Historical artifacts are reused while their cache manifest still matches the merged
/// historical file, the target and the offset; live artifacts are always rebuilt.
pub fn label_all(config: &PipelineConfig) -> Result<StageReport, PipelineError> {
    if config.label_offset == 0 {
        return Err(PipelineError::InvalidOffset);
    }
    let layout = config.layout();
    let mut report = StageReport::new("labeling");

    for target in Target::ALL {
        let hist_upstream = layout.merged_historical_aq();
        let hist_artifact = layout.labeled(target, Source::Historical);
        let key = labeling_key(&hist_upstream, target, config.label_offset)?;
        if is_fresh(&hist_artifact, &key) {
            info!("Reusing {}", hist_artifact.display());
            report.files_reused += 1;
        } else {
            let labeled = label_file(
                &hist_upstream,
                &hist_artifact,
                target,
                config.label_offset,
                &mut report,
            )?;
            record_artifact(&labeled, key, &hist_artifact)?;
        }

        let live_upstream = layout.merged_live_aq();
        let live_artifact = layout.labeled(target, Source::Live);
        label_file(
            &live_upstream,
            &live_artifact,
            target,
            config.label_offset,
            &mut report,
        )?;
    }
    Ok(report)
}

fn labeling_key(upstream: &Path, target: Target, offset: usize) -> Result<CacheKey, PipelineError> {
    if !upstream.is_file() {
        return Err(DataError::MissingUpstreamFile(upstream.to_path_buf()).into());
    }
    Ok(CacheKey::of_upstreams(&[upstream])?
        .with_parameter("target", target.column())
        .with_parameter("label_offset", offset))
}

/// Labels one merged file and writes the labeled rows to `artifact`.
fn label_file(
    upstream: &Path,
    artifact: &Path,
    target: Target,
    offset: usize,
    report: &mut StageReport,
) -> Result<DataFrame, PipelineError> {
    let table = upstream.display().to_string();
    let df = read_csv(upstream)?;
    require_columns(&df, &table, &[COL_STATION_ID, COL_UTC_TIME, target.column()])?;
    let (df, dropped) = normalize_keys(df, &table)?;
    report.record_malformed(table, dropped);

    let labeled = label_frame(df, target, offset)?;
    let total = labeled.height();
    let mut labeled = labeled
        .lazy()
        .filter(col(target.label_column().as_str()).is_not_null())
        .collect()?;
    info!(
        "{}: {} of {} rows labeled from {}",
        target,
        labeled.height(),
        total,
        upstream.display()
    );
    write_csv(&mut labeled, artifact)?;
    report.wrote(labeled.height());
    Ok(labeled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::manifest::CacheManifest;
    use crate::frames::schema::{datetime_column, to_millis};
    use chrono::NaiveDateTime;

    fn at(raw: &str) -> i64 {
        to_millis(NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").unwrap())
    }

    #[test]
    fn labels_only_across_one_hour_steps() {
        let times = [
            at("2018-04-01 10:00:00"),
            at("2018-04-01 11:00:00"),
            at("2018-04-01 13:00:00"),
        ];
        let values = [Some(5.0), Some(7.0), Some(9.0)];
        assert_eq!(label_series(&times, &values, 1), vec![Some(7.0), None, None]);
    }

    #[test]
    fn gap_of_a_full_day_plus_one_hour_is_still_a_gap() {
        // Same hour-of-day one day later must not count as consecutive.
        let times = [at("2018-04-01 10:00:00"), at("2018-04-02 11:00:00")];
        assert_eq!(label_series(&times, &[Some(1.0), Some(2.0)], 1), vec![None, None]);
    }

    #[test]
    fn longer_offsets_need_every_step_contiguous() {
        let times: Vec<i64> = [0, 1, 2, 3, 5, 6]
            .iter()
            .map(|h| h * HOUR_MILLIS)
            .collect();
        let values: Vec<Option<f64>> = (0..6).map(|v| Some(v as f64)).collect();
        assert_eq!(
            label_series(&times, &values, 2),
            vec![Some(2.0), Some(3.0), None, None, None, None]
        );
    }

    #[test]
    fn placeholders_are_labels_but_missing_stays_missing() {
        let times: Vec<i64> = (0..3).map(|h| h * HOUR_MILLIS).collect();
        let values = [Some(1.0), Some(0.0), None];
        assert_eq!(label_series(&times, &values, 1), vec![Some(0.0), None, None]);
    }

    #[test]
    fn stations_are_labeled_independently() -> Result<(), Box<dyn std::error::Error>> {
        let df = DataFrame::new(vec![
            Column::new(COL_STATION_ID.into(), vec!["CD1", "BL0", "BL0", "CD1"]),
            datetime_column(
                COL_UTC_TIME,
                vec![Some(HOUR_MILLIS), Some(0), Some(HOUR_MILLIS), Some(0)],
            )?,
            Column::new("PM10".into(), vec![4.0, 1.0, 2.0, 3.0]),
        ])?;
        let labeled = label_frame(df, Target::Pm10, 1)?;
        let labels: Vec<Option<f64>> = labeled.column("PM10_label")?.f64()?.into_iter().collect();
        assert_eq!(labels, vec![Some(2.0), None, Some(4.0), None]);
        Ok(())
    }

    fn write_merged(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
        let layout = config.layout();
        let body = "station_id,utc_time,longitude,latitude,PM2.5,PM10,NO2\n\
                    BL0,2018-04-01 10:00:00,-0.12,51.52,5.0,10.0,1.0\n\
                    BL0,2018-04-01 11:00:00,-0.12,51.52,7.0,11.0,1.0\n\
                    BL0,2018-04-01 13:00:00,-0.12,51.52,9.0,12.0,1.0\n\
                    BL0,garbage,-0.12,51.52,9.0,12.0,1.0\n";
        for path in [layout.merged_historical_aq(), layout.merged_live_aq()] {
            std::fs::create_dir_all(path.parent().unwrap())?;
            std::fs::write(path, body)?;
        }
        Ok(())
    }

    #[test]
    fn stage_drops_unlabeled_rows_and_reuses_history() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let config = PipelineConfig::builder().data_dir(dir.path()).build();
        write_merged(&config)?;

        let first = label_all(&config)?;
        assert_eq!(first.files_written, 4);
        assert_eq!(first.files_reused, 0);
        assert_eq!(first.malformed_rows(), 4);

        let layout = config.layout();
        let hist = read_csv(&layout.labeled(Target::Pm25, Source::Historical))?;
        assert_eq!(hist.height(), 1);
        assert_eq!(hist.column("PM2.5_label")?.f64()?.get(0), Some(7.0));

        let manifest = CacheManifest::load(&layout.labeled(Target::Pm25, Source::Historical))
            .expect("manifest written");
        assert_eq!(manifest.rows, 1);
        assert_eq!(manifest.first_time.as_deref(), Some("2018-04-01 10:00:00"));

        let second = label_all(&config)?;
        assert_eq!(second.files_reused, 2);
        assert_eq!(second.files_written, 2);
        Ok(())
    }

    #[test]
    fn changing_the_offset_rebuilds_history() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let layout = PipelineConfig::builder().data_dir(dir.path()).build().layout();
        let body = "station_id,utc_time,PM2.5,PM10\n\
                    BL0,2018-04-01 10:00:00,5.0,10.0\n\
                    BL0,2018-04-01 11:00:00,7.0,11.0\n\
                    BL0,2018-04-01 12:00:00,9.0,12.0\n";
        for path in [layout.merged_historical_aq(), layout.merged_live_aq()] {
            std::fs::create_dir_all(path.parent().unwrap())?;
            std::fs::write(path, body)?;
        }

        let next_hour = PipelineConfig::builder().data_dir(dir.path()).build();
        label_all(&next_hour)?;
        let two_hours = PipelineConfig::builder()
            .data_dir(dir.path())
            .label_offset(2)
            .build();
        let report = label_all(&two_hours)?;
        assert_eq!(report.files_reused, 0);

        for source in [Source::Historical, Source::Live] {
            let labeled = read_csv(&layout.labeled(Target::Pm25, source))?;
            assert_eq!(labeled.height(), 1);
            assert_eq!(labeled.column("PM2.5_label")?.f64()?.get(0), Some(9.0));
        }

        let manifest = CacheManifest::load(&layout.labeled(Target::Pm25, Source::Historical))
            .expect("manifest written");
        assert_eq!(
            manifest.key.parameters.get("label_offset").map(String::as_str),
            Some("2")
        );
        Ok(())
    }

    #[test]
    fn zero_offset_is_rejected() {
        let config = PipelineConfig::builder().label_offset(0).build();
        assert!(matches!(label_all(&config), Err(PipelineError::InvalidOffset)));
    }
}
