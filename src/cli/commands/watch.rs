//! Long-running sync loop.

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::Context;
use crate::cli::args::OutputFormat;
use crate::error::KitchenError;
use crate::output::to_json;
use crate::sync::{ConnectivityProbe, ConnectivitySubscription, OfflineQueue};

/// How long a running pass may take to settle after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Probe the remote store, replay on every reconnect, stop on Ctrl-C.
///
/// # Errors
///
/// Returns an error if the remote store is not configured, the queue cannot
/// be opened or the Ctrl-C handler cannot be installed.
pub async fn watch(ctx: &Context) -> Result<String, KitchenError> {
    let remote = ctx.remote()?;
    let queue = ctx.open_queue(remote.clone())?;

    let interval = Duration::from_secs(ctx.config.queue.probe_interval_secs.max(1));
    let (tx, rx) = mpsc::channel(8);
    let subscription = ConnectivitySubscription::register(queue.clone(), rx);
    let probe = ConnectivityProbe::new(remote, interval).spawn(tx);

    info!(
        pending = queue.pending_count(),
        interval_secs = interval.as_secs(),
        "Watching connectivity"
    );

    tokio::signal::ctrl_c().await?;

    let pending = wind_down(&queue, probe, subscription).await;
    match ctx.format {
        OutputFormat::Json => to_json(&json!({ "pending": pending })),
        OutputFormat::Pretty => Ok(format!("Stopped watching, {pending} operations pending")),
    }
}

/// Stop feeding events, let a running pass settle and report what is left.
async fn wind_down(
    queue: &OfflineQueue,
    probe: JoinHandle<()>,
    subscription: ConnectivitySubscription,
) -> usize {
    probe.abort();
    subscription.unsubscribe();
    queue.shutdown(SHUTDOWN_GRACE).await;
    queue.pending_count()
}
