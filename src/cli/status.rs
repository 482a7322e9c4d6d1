use super::config::{resolve_config_path, BiochainConfig};
use biochain::service::current_timestamp;
use biochain::{ChainTracker, CycleReport, ParticipantId};
use std::fmt::Write;

/// Show the canonical chain as of the saved snapshot
///
/// The chain is reselected offline from the stored bios; nothing is fetched,
/// disabled or purged and the snapshot is not written back.
pub async fn execute(
    config_path: Option<String>,
    data_dir: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(config_path, data_dir);
    let config = BiochainConfig::load(&config_path)?;
    let service_config = config.service_config()?;

    let mut tracker = ChainTracker::load(config.tracker_config()?, &service_config.snapshot_path)?;
    let report = tracker.select(current_timestamp());

    print!("{}", render(&tracker, &report));
    Ok(())
}

fn label(tracker: &ChainTracker, id: &ParticipantId) -> String {
    tracker
        .store()
        .get(id)
        .map(|p| p.label())
        .unwrap_or_else(|| format!("[{}]", id))
}

/// Human-readable status report
pub fn render(tracker: &ChainTracker, report: &CycleReport) -> String {
    let mut out = String::new();
    let store = tracker.store();
    let disabled = store.iter().filter(|p| p.disabled).count();

    let _ = writeln!(out, "Biochain Status");
    let _ = writeln!(out);
    let _ = writeln!(out, "Root: {}", label(tracker, &tracker.config().root));
    let _ = writeln!(
        out,
        "Participants: {} ({} disabled)",
        store.len(),
        disabled
    );
    let _ = writeln!(out);

    if report.chain_len == 0 {
        let _ = writeln!(out, "Chain: nobody links to the root yet");
    } else {
        let _ = writeln!(
            out,
            "Chain: {} long, {} unbroken, {}",
            report.chain_len,
            report.unbroken_len,
            if report.valid { "valid" } else { "has stale links" }
        );
        for (position, id) in tracker.selection().canonical.iter().enumerate() {
            let _ = writeln!(out, "  {:>3}. {}", position + 1, label(tracker, id));
        }
    }

    if !report.branch_reports.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Branches: {}", report.branches);
        for branch in &report.branch_reports {
            let _ = writeln!(
                out,
                "  {} should link to {} instead of {}",
                label(tracker, &branch.member),
                label(tracker, &branch.should_link_to),
                label(tracker, &branch.instead_of)
            );
        }
    }

    out
}
