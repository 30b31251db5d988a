//! teamsearch-olymps - Olympiad Diploma Ingest Worker
//!
//! Consumes person lookup requests from the `olymps` queue, discovers the
//! person's published diploma records in the public archive, submits each
//! record to the database API, and publishes a success notification once a
//! message is fully consumed.

use anyhow::Result;
use tracing::info;

use teamsearch_common::config::AppConfig;
use teamsearch_olymps::archive::DiplomaArchive;
use teamsearch_olymps::consumer::OlympsConsumer;
use teamsearch_olymps::services::{DatabaseApiClient, SuccessNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration first: the log level comes from it. Boot failures here
    // surface on stderr through the anyhow return.
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "Starting teamsearch-olymps (olympiad ingest) v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(queue = %config.rabbit.queue, archive = %config.archive.base_url, "configuration loaded");

    let archive = DiplomaArchive::new(&config.archive.base_url)?;
    let db_client = DatabaseApiClient::new(&config.db_api.base_url(), config.db_api.token.as_deref())?;
    let notifier = SuccessNotifier::new(config.rabbit.clone());

    let consumer = OlympsConsumer::new(config.rabbit, archive, db_client, notifier);
    consumer.run().await?;

    Ok(())
}
