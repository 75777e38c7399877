//! Daemon configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use sonority_core::speaker::MAX_VOLUME;
use sonority_core::{ManagerConfig, SpeakerType};
use tracing::info;

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Speaker manager settings
    #[serde(default)]
    pub manager: ManagerConfig,
    /// Software speakers registered at start-up
    #[serde(default = "default_speakers")]
    pub speakers: Vec<SpeakerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self { daemon: DaemonConfig::default(), manager: ManagerConfig::default(), speakers: default_speakers() }
    }
}

/// Daemon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// A software speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerConfig {
    /// Display name
    pub name: String,
    /// Group the speaker belongs to
    pub speaker_type: SpeakerType,
    /// Initial volume (0 - 100)
    #[serde(default = "default_volume")]
    pub volume: u8,
    /// Initial mute state
    #[serde(default)]
    pub mute: bool,
}

fn default_volume() -> u8 {
    50
}

fn default_speakers() -> Vec<SpeakerConfig> {
    vec![
        SpeakerConfig {
            name: "speaker".to_string(),
            speaker_type: SpeakerType::SPEAKER_VOLUME,
            volume: default_volume(),
            mute: false,
        },
        SpeakerConfig {
            name: "alerts".to_string(),
            speaker_type: SpeakerType::ALERTS_VOLUME,
            volume: default_volume(),
            mute: false,
        },
    ]
}

impl Config {
    /// Check every section, including the manager settings.
    pub fn validate(&self) -> Result<()> {
        self.manager.validate().context("Invalid [manager] section")?;
        for speaker in &self.speakers {
            anyhow::ensure!(
                speaker.volume <= MAX_VOLUME,
                "Speaker {:?} volume {} exceeds {MAX_VOLUME}",
                speaker.name,
                speaker.volume
            );
        }
        Ok(())
    }
}

/// Load configuration from file or defaults.
pub fn load_config() -> Result<Config> {
    let config_path = config_path()?;
    load_from(&config_path)
}

/// Load configuration from `path`, using defaults if the file does not exist.
pub fn load_from(config_path: &Path) -> Result<Config> {
    let config = if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {config_path:?}"))?
    } else {
        info!(?config_path, "Config file not found, using defaults");
        Config::default()
    };
    config.validate()?;
    Ok(config)
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "sonority", "sonority").context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}
