use anyhow::{Context, Result};
use clap::Parser;
use forecast_solar_collector::collector::{self, CollectorError};
use forecast_solar_collector::config::Config;
use forecast_solar_collector::export::InfluxWriter;
use forecast_solar_collector::forecast::ForecastSolarClient;
use forecast_solar_collector::telemetry::init_tracing;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

const BUILD_VERSION: &str = match option_env!("FSC_BUILD_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

#[derive(Parser)]
#[command(name = "forecast-solar-collector")]
#[command(version = BUILD_VERSION, about = "Writes forecast.solar production estimates to InfluxDB")]
struct Cli {
    /// Location of the YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let op = err
                .downcast_ref::<CollectorError>()
                .map(CollectorError::op)
                .unwrap_or("main");
            let message = format!("{err:#}");
            error!(op, error = %message, "collection run failed, exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let cfg = Config::load(&cli.config).context("failed to parse configuration")?;
    cfg.validate().context("encountered configuration validation error")?;

    // Both clients close their idle connections when dropped at the end of
    // this scope, on success and on every error return.
    let source = ForecastSolarClient::new(&cfg.forecast_solar)
        .context("failed to build forecast.solar client")?;
    let writer = InfluxWriter::new(&cfg.influxdb).context("failed to build InfluxDB client")?;

    info!(
        arrays = cfg.solar_panels.arrays.len(),
        bucket = writer.bucket(),
        "starting collection"
    );
    let report = collector::run_cycle(&cfg, &source, &writer).await?;

    let quota = report.rate_limit;
    info!(
        op = "main",
        remaining = quota.remaining,
        "there are {} remaining API queries out of {} for the next {} seconds",
        quota.remaining,
        quota.limit,
        quota.period
    );
    Ok(())
}
