//! Engine configuration loaded from YAML.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine-wide configuration.
///
/// Loaded from `~/.case-engine/config.yaml` when present. Every field has a
/// default, so a missing file yields a working configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Directory searched for definition files given by bare name.
    ///
    /// Defaults to `~/.case-engine/definitions`.
    #[serde(default)]
    pub definitions_dir: Option<PathBuf>,

    /// Snapshot the case aggregate after every N committed events.
    ///
    /// Zero disables snapshots; recovery then replays the full event log.
    #[serde(default = "default_snapshot_every")]
    pub snapshot_every: u64,

    /// User id assumed when a command does not name one via `--user`.
    #[serde(default)]
    pub default_user: Option<String>,

    /// Capacity of the per-case event broadcast channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_snapshot_every() -> u64 {
    50
}

fn default_event_channel_capacity() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            definitions_dir: None,
            snapshot_every: default_snapshot_every(),
            default_user: None,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid YAML,
    /// or fails validation.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: EngineConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Loads `~/.case-engine/config.yaml` when it exists, falling back to
    /// defaults otherwise.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = crate::engine_paths::engine_config_path()?;
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid field found.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(user) = &self.default_user {
            if user.trim().is_empty() {
                anyhow::bail!("default_user must not be blank");
            }
        }

        if self.event_channel_capacity == 0 {
            anyhow::bail!("event_channel_capacity must be at least 1");
        }

        Ok(())
    }
}
