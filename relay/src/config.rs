use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use comms::event::ClientConfig;
use serde::{Deserialize, Serialize};

/// Relay configuration, every field falls back to its default when missing from the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub port: u16,
    /// Shared secret every action must carry, empty disables the check
    pub access_token: String,
    /// Room info broadcasts per second
    pub broadcast_freq: f64,
    pub show_smallest_viewport: bool,
    pub upload_dir: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            port: 8080,
            access_token: String::new(),
            broadcast_freq: 1.0,
            show_smallest_viewport: true,
            upload_dir: PathBuf::from("public/uploads"),
        }
    }
}

impl RelayConfig {
    /// Reads a YAML config file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config file '{}'", path.display()))?;

        Self::from_yaml(&raw)
            .with_context(|| format!("could not parse config file '{}'", path.display()))
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let config: RelayConfig = serde_yaml::from_str(raw)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.broadcast_freq.is_finite() || self.broadcast_freq <= 0.0 {
            anyhow::bail!(
                "broadcast_freq must be a positive number, got {}",
                self.broadcast_freq
            );
        }

        Ok(())
    }

    /// Time between two state broadcasts
    pub fn broadcast_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.broadcast_freq)
    }

    /// The part of the configuration clients need to know about
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            show_smallest_viewport: self.show_smallest_viewport,
            broadcast_freq: self.broadcast_freq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        assert_eq!(RelayConfig::from_yaml("{}").unwrap(), RelayConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = RelayConfig::from_yaml(
            "access_token: secret\nbroadcast_freq: 4\nshow_smallest_viewport: false\n",
        )
        .unwrap();

        assert_eq!(config.access_token, "secret");
        assert_eq!(config.broadcast_period(), Duration::from_millis(250));
        assert!(!config.show_smallest_viewport);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_frequency() {
        assert!(RelayConfig::from_yaml("broadcast_freq: 0").is_err());
        assert!(RelayConfig::from_yaml("broadcast_freq: -2").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(RelayConfig::load(Path::new("/definitely/not/here.yml")).is_err());
    }
}
