use std::sync::Arc;

use anyhow::Context;
use sensorgate_gateway::configs::Settings;
use sensorgate_gateway::logging::RotatingFile;
use sensorgate_gateway::run;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::new().context("Failed to load settings.")?;

    let log = match &settings.logger.file {
        Some(path) => Some(Arc::new(
            RotatingFile::open(path, settings.logger.max_bytes)
                .with_context(|| format!("Failed to open log file {path}"))?,
        )),
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
            let level = settings.logger.level.as_str();

            format!("{app_name}={level},sensorgate_drivers={level}").into()
        }))
        .with(fmt::layer())
        .with(log.clone().map(|file| fmt::layer().with_ansi(false).with_writer(file)))
        .init();

    let reason = run(&settings, log).await;

    tracing::info!("gateway stopped: {:?}", reason);

    Ok(())
}
