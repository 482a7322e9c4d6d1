//! Long-running tracker loop.
//!
//! Steps the tracker until shutdown is requested. Shutdown is only observed
//! between steps, so a refresh or recompute always finishes and the snapshot
//! on disk is consistent wherever the loop stops.

use crate::refresh::ProfileSource;
use crate::tracker::{ChainTracker, StepOutcome, TrackerError};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Default pause when nothing is due
pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Where the snapshot is saved after every change
    pub snapshot_path: PathBuf,
    /// Pause between steps when nothing is due
    pub idle_delay: Duration,
}

impl ServiceConfig {
    pub fn new(snapshot_path: PathBuf) -> Self {
        Self {
            snapshot_path,
            idle_delay: DEFAULT_IDLE_DELAY,
        }
    }
}

/// Seconds since the Unix epoch
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Run until `shutdown` turns true or its sender is dropped.
///
/// The chain is selected once from the loaded state before the first
/// refresh; disabling and purging wait for the first drained cycle. Save
/// failures are logged and retried after the next step; only the final
/// save's error is returned.
pub async fn run<S>(
    tracker: &mut ChainTracker,
    source: &S,
    config: &ServiceConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), TrackerError>
where
    S: ProfileSource + ?Sized,
{
    info!(
        root = %tracker.config().root,
        participants = tracker.store().len(),
        "chain tracker starting"
    );

    tracker.select(current_timestamp());
    save_or_warn(tracker, config);

    loop {
        if *shutdown.borrow() {
            break;
        }

        let outcome = tracker.step(source, current_timestamp()).await;
        match &outcome {
            StepOutcome::Refreshed {
                participant,
                changes,
                forced,
            } => {
                debug!(
                    participant = %participant,
                    changes = changes.len(),
                    forced = forced.len(),
                    "refresh finished"
                );
            }
            StepOutcome::Recomputed(report) => {
                if report.head_changed() {
                    info!(
                        previous = ?report.previous_head,
                        head = ?report.head,
                        "chain head changed"
                    );
                }
                for branch in &report.branch_reports {
                    info!(
                        member = %branch.member,
                        should_link_to = %branch.should_link_to,
                        instead_of = %branch.instead_of,
                        "branch off the canonical chain"
                    );
                }
            }
            StepOutcome::Drained | StepOutcome::Idle => {}
        }

        if tracker.is_dirty() {
            save_or_warn(tracker, config);
        }

        if outcome == StepOutcome::Idle {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(config.idle_delay) => {}
            }
        }
    }

    info!("chain tracker stopping");
    tracker.save(&config.snapshot_path)
}

fn save_or_warn(tracker: &mut ChainTracker, config: &ServiceConfig) {
    if let Err(e) = tracker.save(&config.snapshot_path) {
        warn!(error = %e, "failed to save snapshot, will retry");
    }
}
