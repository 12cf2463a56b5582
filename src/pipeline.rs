//! The entry point tying the stages together.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::features::generate_features;
use crate::integration::integrate_all;
use crate::labeling::label_all;
use crate::report::StageReport;
use crate::retrieval::fetcher::RawDataFetcher;
use crate::types::horizon::ForecastHorizon;
use bon::bon;
use chrono::{Local, Utc};
use log::info;

/// Runs the retrieval, integration, labeling and feature stages over one data directory.
///
/// Every stage reads the previous stage's files from disk, so stages can be run one at a
/// time or all together with [`AirQualityPipeline::run`].
///
/// # Examples
///
/// ```no_run
/// # use aq_forecast::{AirQualityPipeline, PipelineConfig, PipelineError, ForecastHorizon};
/// # fn run() -> Result<(), PipelineError> {
/// let pipeline = AirQualityPipeline::new(PipelineConfig::builder().data_dir("data").build());
/// pipeline.integrate()?;
/// pipeline.label()?;
/// pipeline
///     .features()
///     .horizon(ForecastHorizon::new("2018-05-01", "2018-05-02")?)
///     .call()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AirQualityPipeline {
    config: PipelineConfig,
}

#[bon]
impl AirQualityPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Downloads missing raw day partitions; see [`RawDataFetcher::retrieve_all`].
    pub fn retrieve(&self) -> Result<StageReport, PipelineError> {
        let fetcher = RawDataFetcher::new(&self.config)?;
        let report = fetcher.retrieve_all(Utc::now().naive_utc())?;
        report.log_summary();
        Ok(report)
    }

    /// Merges raw London files into the keyed tables under `input/london/`.
    pub fn integrate(&self) -> Result<StageReport, PipelineError> {
        let report = integrate_all(&self.config)?;
        report.log_summary();
        Ok(report)
    }

    /// Labels historical and live air-quality readings for every target.
    pub fn label(&self) -> Result<StageReport, PipelineError> {
        let report = label_all(&self.config)?;
        report.log_summary();
        Ok(report)
    }

    /// Writes the train and test feature files.
    ///
    /// Without a `horizon` the forecast covers the two days after today's local date.
    #[builder]
    pub fn features(&self, horizon: Option<ForecastHorizon>) -> Result<StageReport, PipelineError> {
        let horizon = horizon.unwrap_or_else(default_horizon);
        let report = generate_features(&self.config, &horizon)?;
        report.log_summary();
        Ok(report)
    }

    /// Runs every stage in order, stopping at the first fatal error.
    ///
    /// Returns one report per stage that ran.
    #[builder]
    pub fn run(
        &self,
        horizon: Option<ForecastHorizon>,
        #[builder(default = false)] skip_retrieval: bool,
    ) -> Result<Vec<StageReport>, PipelineError> {
        let horizon = horizon.unwrap_or_else(default_horizon);
        info!("Running pipeline in {} for horizon {}", self.config.data_dir.display(), horizon);

        let mut reports = Vec::with_capacity(4);
        if skip_retrieval {
            info!("Skipping retrieval");
        } else {
            reports.push(self.retrieve()?);
        }
        reports.push(self.integrate()?);
        reports.push(self.label()?);
        reports.push(self.features().horizon(horizon).call()?);
        Ok(reports)
    }
}

fn default_horizon() -> ForecastHorizon {
    ForecastHorizon::following(Local::now().date_naive())
}
