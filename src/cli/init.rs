use super::config::{default_config_path, default_data_dir, default_snapshot_path, BiochainConfig};
use biochain::{ChainTracker, ParticipantId, TrackerConfig};
use std::path::PathBuf;

/// Create a new game in the data directory
///
/// Writes `config.toml` and a snapshot holding only the root participant.
/// The root's handle is filled in by the first refresh.
pub async fn execute(
    root: String,
    data_dir: Option<String>,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = root.trim();
    if root.is_empty() {
        return Err("Root participant id must not be empty".into());
    }

    let data_dir = data_dir.map(PathBuf::from).unwrap_or_else(default_data_dir);
    let config_path = default_config_path(&data_dir);
    let snapshot_path = default_snapshot_path(&data_dir);

    for existing in [&config_path, &snapshot_path] {
        if existing.exists() && !force {
            return Err(format!(
                "'{}' already exists. Use --force to overwrite",
                existing.display()
            )
            .into());
        }
    }

    BiochainConfig::create_default(&config_path, root, &data_dir)?;
    let config = BiochainConfig::load(&config_path)?;

    let mut tracker = ChainTracker::new(TrackerConfig::new(ParticipantId::new(root)));
    tracker.save(&snapshot_path)?;

    println!("Created: {}", config_path.display());
    println!("Created: {}", snapshot_path.display());
    println!();
    println!(
        "Point your profile fetcher at {} and start with `biochain run`",
        config.profiles.source_path.display()
    );

    Ok(())
}
