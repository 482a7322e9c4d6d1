//! Biochain configuration file handling
//!
//! Configuration files are TOML and live in the data directory next to the
//! snapshot. The library never reads this file: `run` and `status` turn it
//! into a `TrackerConfig` and `ServiceConfig` and pass those in.

use biochain::service::{ServiceConfig, DEFAULT_IDLE_DELAY};
use biochain::scheduler::{DEFAULT_BACKLOG_WARNING, DEFAULT_REFRESH_INTERVAL};
use biochain::{ParticipantId, TrackerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Biochain operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiochainConfig {
    /// Game parameters
    pub game: GameConfig,

    /// Snapshot location
    pub storage: StorageConfig,

    /// Profile observations feed
    pub profiles: ProfilesConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Game parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Participant id every chain must end at
    pub root: String,

    /// How long a refreshed participant stays fresh (humantime, e.g. "60s")
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: String,

    /// Warn when this many participants are due at once (0 = never)
    #[serde(default = "default_backlog_warning")]
    pub backlog_warning: usize,

    /// Pause when nothing is due (humantime)
    #[serde(default = "default_idle_delay")]
    pub idle_delay: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the JSON snapshot of participants and links
    pub snapshot_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// JSON file of observed profiles, kept current by the fetcher
    pub source_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_refresh_interval() -> String {
    format!("{}s", DEFAULT_REFRESH_INTERVAL)
}

fn default_backlog_warning() -> usize {
    DEFAULT_BACKLOG_WARNING
}

fn default_idle_delay() -> String {
    humantime::format_duration(DEFAULT_IDLE_DELAY).to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// Parse a humantime duration, naming the offending field on failure
fn parse_duration(field: &str, input: &str) -> Result<Duration, String> {
    humantime::parse_duration(input)
        .map_err(|e| format!("Invalid duration for {} '{}': {}", field, input, e))
}

impl BiochainConfig {
    /// Create a new configuration with everything under `data_dir`
    pub fn new(root: String, data_dir: &Path) -> Self {
        Self {
            game: GameConfig {
                root,
                refresh_interval: default_refresh_interval(),
                backlog_warning: default_backlog_warning(),
                idle_delay: default_idle_delay(),
            },
            storage: StorageConfig {
                snapshot_path: default_snapshot_path(data_dir),
            },
            profiles: ProfilesConfig {
                source_path: default_profiles_path(data_dir),
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: BiochainConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        if config.game.root.trim().is_empty() {
            return Err(format!("Config file '{}' has an empty game.root", path.display()).into());
        }

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Game parameters for the tracker
    pub fn tracker_config(&self) -> Result<TrackerConfig, String> {
        let refresh_interval =
            parse_duration("game.refresh_interval", &self.game.refresh_interval)?;
        if refresh_interval.as_secs() == 0 {
            return Err("game.refresh_interval must be at least one second".to_string());
        }

        Ok(TrackerConfig {
            root: ParticipantId::new(self.game.root.trim()),
            refresh_interval: refresh_interval.as_secs(),
            backlog_warning: self.game.backlog_warning,
        })
    }

    /// Loop parameters for the service
    pub fn service_config(&self) -> Result<ServiceConfig, String> {
        Ok(ServiceConfig {
            snapshot_path: self.storage.snapshot_path.clone(),
            idle_delay: parse_duration("game.idle_delay", &self.game.idle_delay)?,
        })
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(root: &str, data_dir: &Path) -> String {
        format!(
            r#"# Biochain Configuration
#
# The chain game: every participant puts the handle of the participant
# before them in their bio, and the chain ends at the root participant.

[game]
# Participant id every chain must end at
root = "{root}"

# How long a refreshed participant stays fresh before being checked again
refresh_interval = "{refresh_interval}"

# Log a warning when this many participants are waiting for a refresh
backlog_warning = {backlog_warning}

# Pause between checks when nobody is due
idle_delay = "{idle_delay}"

[storage]
# JSON snapshot of participants and their links
snapshot_path = "{snapshot_path}"

[profiles]
# JSON file of observed profiles, kept current by the profile fetcher
source_path = "{source_path}"

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/biochain/biochain.log"
"#,
            root = root,
            refresh_interval = default_refresh_interval(),
            backlog_warning = DEFAULT_BACKLOG_WARNING,
            idle_delay = default_idle_delay(),
            snapshot_path = default_snapshot_path(data_dir).display(),
            source_path = default_profiles_path(data_dir).display(),
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        root: &str,
        data_dir: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(root, data_dir);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Get the default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("biochain")
}

/// Config file inside the data directory
pub fn default_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Snapshot file inside the data directory
pub fn default_snapshot_path(data_dir: &Path) -> PathBuf {
    data_dir.join("db.json")
}

/// Profile observations file inside the data directory
pub fn default_profiles_path(data_dir: &Path) -> PathBuf {
    data_dir.join("profiles.json")
}

/// Resolve `--config` / `--data-dir` into a config path
pub fn resolve_config_path(config: Option<String>, data_dir: Option<String>) -> PathBuf {
    match config {
        Some(path) => PathBuf::from(path),
        None => default_config_path(
            &data_dir
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
        ),
    }
}
