//! Pipeline configuration and the on-disk layout of every stage's files.

use crate::features::rolling::RollingWindow;
use crate::types::data_kind::{City, DataKind};
use crate::types::target::Target;
use bon::Builder;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

const DEFAULT_ENDPOINT: &str = "https://biendata.com/competition";
const DEFAULT_TOKEN: &str = "2k0d1d8";

/// London stations the competition asks predictions for.
const PREDICTION_STATIONS: [&str; 13] = [
    "BL0", "CD9", "CD1", "GN0", "GR4", "GN3", "GR9", "HV1", "KF1", "LW2", "ST5", "TH4", "MY7",
];

fn default_first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 3, 31).unwrap_or_default()
}

fn default_stations() -> Vec<String> {
    PREDICTION_STATIONS.iter().map(|s| s.to_string()).collect()
}

/// Settings shared by every stage.
///
/// Every field has a default, so `PipelineConfig::builder().build()` gives the
/// competition setup rooted at the current directory.
///
/// # Examples
///
/// ```
/// use aq_forecast::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .data_dir("/tmp/aq")
///     .label_offset(1)
///     .build();
/// assert_eq!(config.stations.len(), 13);
/// assert_eq!(config.windows.len(), 3);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct PipelineConfig {
    /// Root holding `raw_data/`, `input/` and `feature/`.
    #[builder(into, default = PathBuf::from("."))]
    pub data_dir: PathBuf,
    /// Base URL of the data endpoint.
    #[builder(into, default = DEFAULT_ENDPOINT.to_string())]
    pub endpoint: String,
    /// Access token appended to every endpoint URL.
    #[builder(into, default = DEFAULT_TOKEN.to_string())]
    pub token: String,
    /// First day of live data published by the endpoint.
    #[builder(default = default_first_day())]
    pub first_day: NaiveDate,
    /// Stations kept when integrating live air-quality data.
    #[builder(default = default_stations())]
    pub stations: Vec<String>,
    /// Hours between an input row and its label.
    #[builder(default = 1)]
    pub label_offset: usize,
    /// Trailing windows for the rolling statistics.
    #[builder(default = RollingWindow::defaults())]
    pub windows: Vec<RollingWindow>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PipelineConfig {
    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.data_dir)
    }
}

/// Which side of the forecast boundary a feature file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

/// Where the labeled data for a target came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Historical,
    Live,
}

impl Source {
    fn file_segment(&self) -> &'static str {
        match self {
            Source::Historical => "hist",
            Source::Live => "live",
        }
    }
}

/// The fixed directory convention under the data root.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn raw_root(&self) -> PathBuf {
        self.root.join("raw_data")
    }

    fn input_dir(&self) -> PathBuf {
        self.root.join("input").join(City::London.name())
    }

    /// Directory of day-partitioned raw files for one kind and city.
    pub fn raw_kind_dir(&self, kind: DataKind, city: City) -> PathBuf {
        self.raw_root().join(city.name()).join(kind.path_segment())
    }

    pub fn raw_day_file(&self, kind: DataKind, city: City, day: NaiveDate) -> PathBuf {
        self.raw_kind_dir(kind, city).join(format!(
            "{}_{}_{}.csv",
            city.code(),
            kind.path_segment(),
            day.format("%Y%m%d")
        ))
    }

    /// Single file holding everything from `first_day` up to `today`.
    pub fn raw_range_file(
        &self,
        kind: DataKind,
        city: City,
        first_day: NaiveDate,
        today: NaiveDate,
    ) -> PathBuf {
        self.raw_root().join(city.name()).join(format!(
            "{}_{}_{}_{}.csv",
            city.code(),
            kind.path_segment(),
            first_day.format("%Y%m%d"),
            today.format("%Y%m%d")
        ))
    }

    pub fn raw_historical_aq(&self) -> PathBuf {
        self.raw_root()
            .join("London_historical_aqi_forecast_stations_20180331.csv")
    }

    pub fn aq_station_reference(&self) -> PathBuf {
        self.raw_root().join("London_AirQuality_Stations.csv")
    }

    pub fn grid_station_reference(&self) -> PathBuf {
        self.raw_root().join("London_grid_weather_station.csv")
    }

    pub fn merged_historical_aq(&self) -> PathBuf {
        self.input_dir().join("london_aq_hist_data_merged.csv")
    }

    pub fn merged_live_aq(&self) -> PathBuf {
        self.input_dir().join("london_aq_live_data_merged.csv")
    }

    pub fn merged_live_grid(&self) -> PathBuf {
        self.input_dir().join("london_grid_live_data_merged.csv")
    }

    pub fn labeled(&self, target: Target, source: Source) -> PathBuf {
        self.input_dir().join(format!(
            "london_{}_{}_data_w_label.csv",
            target.file_tag(),
            source.file_segment()
        ))
    }

    pub fn feature_file(&self, split: Split, target: Target, name: &str) -> PathBuf {
        self.root
            .join("feature")
            .join(City::London.name())
            .join(split.dir_name())
            .join(target.column())
            .join(name)
    }
}
