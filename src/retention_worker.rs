// Background worker: delete request events older than database.retention_days.
// Runs every prune_interval_secs until aborted.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::usage_repo::UsageRepo;

/// Spawns the retention worker. Returns a join handle.
pub fn spawn(repo: Arc<UsageRepo>, prune_interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(repo, prune_interval_secs).await;
    })
}

#[instrument(skip(repo))]
async fn run(repo: Arc<UsageRepo>, prune_interval_secs: u64) {
    let mut prune_tick = tokio::time::interval(Duration::from_secs(prune_interval_secs));
    prune_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        prune_tick.tick().await;
        match repo.prune_old_data().await {
            Ok(0) => debug!(operation = "prune_old_data", "nothing to prune"),
            Ok(deleted) => info!(operation = "prune_old_data", deleted, "pruned old request events"),
            Err(e) => warn!(error = %e, operation = "prune_old_data", "Failed to prune old data"),
        }
    }
}
