mod cache;
mod config;
mod error;
mod features;
mod frames;
mod integration;
mod labeling;
mod pipeline;
mod report;
mod retrieval;
mod types;
mod utils;

pub use config::*;
pub use error::PipelineError;
pub use pipeline::*;
pub use report::{RecoverableIssue, StageReport};

pub use cache::error::CacheError;
pub use cache::manifest::{
    is_fresh, manifest_path, CacheKey, CacheManifest, UpstreamFingerprint, UpstreamRecord,
};
pub use frames::error::DataError;
pub use retrieval::error::RetrievalError;
pub use retrieval::fetcher::{pending_days, RawDataFetcher};

pub use types::any_date::AnyDate;
pub use types::data_kind::{City, DataKind, RETRIEVAL_PAIRS};
pub use types::horizon::{ForecastHorizon, HOURS_PER_DAY};
pub use types::target::Target;

pub use features::calendar::{calendar_features, week_of_month, CalendarFeatures, CALENDAR_COLUMNS};
pub use features::horizon::extend_with_horizon;
pub use features::merge::{merge_features, split_at_horizon, FeatureSplit};
pub use features::rolling::{
    feature_column, rolling_features, rolling_series, RollingStat, RollingWindow, WindowStats,
};
pub use features::{
    datetime_feature_columns, generate_features, AIR_QUALITY_FEATURES_FILE, ALL_FEATURES_FILE,
    DATETIME_FEATURES_FILE,
};
pub use frames::filtering::TimeFrameFilterExt;
pub use frames::io::{read_csv, write_csv, TIME_FORMAT};
pub use frames::schema::{normalize_keys, parse_utc_time, KEY_COLUMNS};
pub use integration::stations::StationDirectory;
pub use integration::{integrate_all, merge_readings, read_historical_aq, read_live};
pub use labeling::{label_all, label_frame, label_series};
