use anyhow::{Context, Result};
use ingest_stress::config::{Config, ReportFormat};
use ingest_stress::{report, telemetry, LoadDriver};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let cfg = Config::load().context("failed to load configuration")?;
    let format = cfg.report.format;

    if format == ReportFormat::Text {
        println!("{}", report::banner(&cfg));
    }

    let driver = LoadDriver::new(cfg)?;
    let report = driver.run_until(telemetry::shutdown_signal()).await?;

    println!("{}", report.render(format)?);
    info!("done");
    Ok(())
}
