//! Configuration for ClanTracker
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// ClanTracker - clan configuration gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "clantracker")]
#[command(about = "Serves chat-authored clan configuration by clan identifier")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Directory holding the identifier registry
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Registry file name inside DATA_DIR
    #[arg(long, env = "IDENTIFIER_FILE", default_value = "clan_identifiers.json")]
    pub identifier_file: String,

    /// Root of the channel history archive (<root>/<owner_id>/<channel>.json)
    #[arg(long, env = "ARCHIVE_DIR", default_value = "data/channels")]
    pub archive_dir: PathBuf,

    /// Channel holding the clan configuration (required for /api/clan_info)
    #[arg(long, env = "CLANTRACKER_CONFIG_CHANNEL", default_value = "ct-config")]
    pub config_channel: String,

    /// Channel holding manual point adjustments (optional)
    #[arg(
        long,
        env = "CLANTRACKER_MANUAL_POINTS_CHANNEL",
        default_value = "ct-manual-points"
    )]
    pub manual_points_channel: String,

    /// Channel where the bot announces the clan identifier
    #[arg(long, env = "CLANTRACKER_INFO_CHANNEL", default_value = "ct-info")]
    pub info_channel: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Full path of the registry file
    pub fn identifier_path(&self) -> PathBuf {
        self.data_dir.join(&self.identifier_file)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let channels = [
            ("CLANTRACKER_CONFIG_CHANNEL", &self.config_channel),
            ("CLANTRACKER_MANUAL_POINTS_CHANNEL", &self.manual_points_channel),
            ("CLANTRACKER_INFO_CHANNEL", &self.info_channel),
        ];
        for (var, name) in channels {
            if name.trim().is_empty() {
                return Err(format!("{} must not be empty", var));
            }
        }

        if self.config_channel == self.manual_points_channel {
            return Err(
                "CLANTRACKER_CONFIG_CHANNEL and CLANTRACKER_MANUAL_POINTS_CHANNEL must differ"
                    .to_string(),
            );
        }

        if self.identifier_file.trim().is_empty() {
            return Err("IDENTIFIER_FILE must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["clantracker"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults_validate() {
        let args = parse(&[
            "--config-channel",
            "ct-config",
            "--manual-points-channel",
            "ct-manual-points",
            "--info-channel",
            "ct-info",
        ]);
        assert!(args.validate().is_ok());
        assert_eq!(
            args.identifier_path(),
            PathBuf::from(&args.data_dir).join(&args.identifier_file)
        );
    }

    #[test]
    fn test_rejects_empty_channel() {
        let args = parse(&["--config-channel", " "]);
        assert!(args.validate().unwrap_err().contains("CLANTRACKER_CONFIG_CHANNEL"));
    }

    #[test]
    fn test_rejects_same_channels() {
        let args = parse(&["--config-channel", "same", "--manual-points-channel", "same"]);
        assert!(args.validate().is_err());
    }
}
