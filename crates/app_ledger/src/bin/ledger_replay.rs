//! Ledger replay tool
//!
//! Connects to the configured event store, applies pending migrations and
//! rebuilds every read model from the log. Every stream is then replayed
//! through its aggregate; the tool exits non-zero when any stream does not
//! replay, listing each broken stream.
//!
//! # Environment Variables
//!
//! * `LEDGER_DATABASE_URL` - PostgreSQL connection string
//! * `LEDGER_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `LEDGER_STORE_BACKEND` - `postgres` or `memory` (default: postgres)
//! * `LEDGER_LOG_LEVEL` - Log filter (default: info)

use anyhow::Context;
use app_ledger::{Ledger, LedgerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LedgerConfig::load().context("invalid ledger configuration")?;
    init_tracing(&config.log_level);

    tracing::info!(backend = ?config.store_backend, "Starting ledger replay");

    let ledger = Ledger::connect(&config)
        .await
        .context("failed to open the event store")?;
    let report = ledger
        .verify_streams()
        .await
        .context("failed to read the event log")?;

    for failure in &report.failures {
        tracing::error!(
            stream_id = %failure.stream_id,
            category = failure.category,
            reason = %failure.reason,
            "Stream does not replay"
        );
    }
    if !report.is_healthy() {
        anyhow::bail!(
            "{} of {} streams do not replay",
            report.failures.len(),
            report.streams
        );
    }

    tracing::info!(
        streams = report.streams,
        events = report.events,
        "Replay complete"
    );
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
