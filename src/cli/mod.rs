use clap::{Parser, Subcommand};

pub mod config;
pub mod init;
pub mod logging;
pub mod run;
pub mod status;
pub mod version;

#[derive(Parser)]
#[command(name = "biochain")]
#[command(author = "Biochain Project")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the biochain group game tracker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a config file and a snapshot holding only the root participant
    Init {
        /// Participant id every chain must end at
        #[arg(long)]
        root: String,

        /// Data directory (default: ~/.local/share/biochain)
        #[arg(long)]
        data_dir: Option<String>,

        /// Overwrite an existing config file and snapshot
        #[arg(long)]
        force: bool,
    },

    /// Run the tracker service
    Run {
        /// Path to config file (default: <data-dir>/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Data directory (default: ~/.local/share/biochain)
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// Recompute the chain from the saved snapshot and print it
    Status {
        /// Path to config file (default: <data-dir>/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Data directory (default: ~/.local/share/biochain)
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Init {
            root,
            data_dir,
            force,
        } => init::execute(root, data_dir, force).await,
        Commands::Run { config, data_dir } => run::execute(config, data_dir).await,
        Commands::Status { config, data_dir } => status::execute(config, data_dir).await,
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["biochain", "init", "--root", "16507419"]);

        match cli.command {
            Commands::Init {
                root,
                data_dir,
                force,
            } => {
                assert_eq!(root, "16507419");
                assert_eq!(data_dir, None);
                assert!(!force);
            }
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_cli_parse_init_requires_root() {
        assert!(Cli::try_parse_from(["biochain", "init"]).is_err());
    }

    #[test]
    fn test_cli_parse_init_with_all_options() {
        let cli = Cli::parse_from([
            "biochain",
            "init",
            "--root",
            "42",
            "--data-dir",
            "/srv/biochain",
            "--force",
        ]);

        match cli.command {
            Commands::Init {
                root,
                data_dir,
                force,
            } => {
                assert_eq!(root, "42");
                assert_eq!(data_dir, Some("/srv/biochain".to_string()));
                assert!(force);
            }
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["biochain", "run", "--config", "/etc/biochain/config.toml"]);

        match cli.command {
            Commands::Run { config, data_dir } => {
                assert_eq!(config, Some("/etc/biochain/config.toml".to_string()));
                assert_eq!(data_dir, None);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_defaults() {
        let cli = Cli::parse_from(["biochain", "run"]);

        match cli.command {
            Commands::Run { config, data_dir } => {
                assert_eq!(config, None);
                assert_eq!(data_dir, None);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["biochain", "status", "--data-dir", "/tmp/game"]);

        match cli.command {
            Commands::Status { config, data_dir } => {
                assert_eq!(config, None);
                assert_eq!(data_dir, Some("/tmp/game".to_string()));
            }
            _ => panic!("Expected Status command"),
        }
    }

    #[test]
    fn test_cli_parse_version() {
        let cli = Cli::parse_from(["biochain", "version"]);
        assert!(matches!(cli.command, Commands::Version));
    }
}
