use super::config::{resolve_config_path, BiochainConfig};
use super::logging::init_logging;
use biochain::refresh::FileProfileSource;
use biochain::service;
use biochain::ChainTracker;
use tokio::sync::watch;
use tracing::{info, warn};

/// Run the tracker service
///
/// Loads the config and snapshot, then refreshes participants from the
/// profiles file and recomputes the chain until Ctrl-C. The snapshot is
/// saved after every change and once more on the way out.
///
/// ## Configuration Loading
///
/// 1. `--config` flag if provided
/// 2. `config.toml` inside `--data-dir` if provided
/// 3. Default config at `~/.local/share/biochain/config.toml`
///
/// Unlike `status`, a missing config is an error: the root participant has
/// to be chosen with `biochain init`.
pub async fn execute(
    config_path: Option<String>,
    data_dir: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(config_path, data_dir);
    if !config_path.exists() {
        return Err(format!(
            "No config file at '{}'. Run `biochain init --root <id>` first",
            config_path.display()
        )
        .into());
    }

    let config = BiochainConfig::load(&config_path)?;
    init_logging(&config.logging)?;
    info!(config = %config_path.display(), "starting biochain");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(e) => warn!(error = %e, "failed to listen for ctrl-c, stopping"),
        }
        let _ = shutdown_tx.send(true);
    });

    run_service(&config, shutdown_rx).await
}

/// Build the tracker and profile source from `config` and run the loop
pub async fn run_service(
    config: &BiochainConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let tracker_config = config.tracker_config()?;
    let service_config = config.service_config()?;

    let mut tracker = ChainTracker::load(tracker_config, &service_config.snapshot_path)?;
    let source = FileProfileSource::new(&config.profiles.source_path);

    service::run(&mut tracker, &source, &service_config, shutdown).await?;
    Ok(())
}
