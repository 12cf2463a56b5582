use aq_forecast::{AirQualityPipeline, ForecastHorizon, PipelineConfig, PipelineError};
use clap::{Args, Parser, Subcommand};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "aq-pipeline")]
#[command(about = "Retrieve, merge, label and featurize London air-quality data", long_about = None)]
struct Cli {
    /// Root directory holding raw_data/, input/ and feature/
    #[arg(long, env = "AQ_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Base URL of the data endpoint
    #[arg(long, env = "AQ_ENDPOINT")]
    endpoint: Option<String>,

    /// Endpoint access token
    #[arg(long, env = "AQ_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download missing raw day files
    Retrieve,
    /// Merge raw London files with station coordinates
    Integrate,
    /// Attach next-hour labels to merged air-quality data
    Label,
    /// Build train/test feature files
    Features(HorizonArgs),
    /// Run every stage in order
    Run {
        #[command(flatten)]
        horizon: HorizonArgs,

        /// Start from integration, using raw files already on disk
        #[arg(long)]
        skip_retrieval: bool,
    },
}

#[derive(Args, Debug)]
struct HorizonArgs {
    /// First forecast day (YYYY-MM-DD); defaults to tomorrow
    day1: Option<String>,
    /// Second forecast day (YYYY-MM-DD); defaults to the day after tomorrow
    day2: Option<String>,
}

impl HorizonArgs {
    fn horizon(&self) -> Result<Option<ForecastHorizon>, PipelineError> {
        match (&self.day1, &self.day2) {
            (Some(first), Some(second)) => ForecastHorizon::new(first, second).map(Some),
            (None, None) => Ok(None),
            (Some(only), None) | (None, Some(only)) => Err(PipelineError::DateParsing(format!(
                "{only} (two forecast days are required)"
            ))),
        }
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let config = PipelineConfig::builder()
        .data_dir(cli.data_dir)
        .maybe_endpoint(cli.endpoint)
        .maybe_token(cli.token)
        .build();
    let pipeline = AirQualityPipeline::new(config);

    match cli.command {
        Command::Retrieve => {
            pipeline.retrieve()?;
        }
        Command::Integrate => {
            pipeline.integrate()?;
        }
        Command::Label => {
            pipeline.label()?;
        }
        Command::Features(args) => {
            pipeline.features().maybe_horizon(args.horizon()?).call()?;
        }
        Command::Run {
            horizon,
            skip_retrieval,
        } => {
            pipeline
                .run()
                .maybe_horizon(horizon.horizon()?)
                .skip_retrieval(skip_retrieval)
                .call()?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
