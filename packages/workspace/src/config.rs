use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "studio.config.json";

/// Studio configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioConfig {
    /// Base URL of the persistence server
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_project_id")]
    pub project_id: String,

    #[serde(default = "default_tree_id")]
    pub tree_id: String,

    /// How often pending patches are harvested into a sync job
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,

    /// Undo history depth, 0 for unlimited
    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,

    /// Pixels from an element's top or bottom edge that count as the edge
    #[serde(default = "default_drop_edge_threshold")]
    pub drop_edge_threshold: f64,

    /// Delay before the canvas re-publishes the tree after a change
    #[serde(default = "default_snapshot_debounce_ms")]
    pub snapshot_debounce_ms: u64,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:3030".to_string()
}

fn default_project_id() -> String {
    "default".to_string()
}

fn default_tree_id() -> String {
    "main".to_string()
}

fn default_sync_interval_ms() -> u64 {
    1000
}

fn default_undo_levels() -> usize {
    100
}

fn default_drop_edge_threshold() -> f64 {
    studio_canvas::DEFAULT_EDGE_THRESHOLD
}

fn default_snapshot_debounce_ms() -> u64 {
    16
}

impl StudioConfig {
    /// Load config from a directory, falling back to defaults when the
    /// file does not exist
    pub fn load(cwd: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_path = Self::path_in(cwd);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: StudioConfig = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(StudioConfig::default())
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.sync_interval_ms > 0, "syncIntervalMs must be greater than zero");
        Ok(())
    }

    pub fn path_in(cwd: impl AsRef<Path>) -> PathBuf {
        cwd.as_ref().join(DEFAULT_CONFIG_NAME)
    }

    /// Clamped to at least one millisecond
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms.max(1))
    }

    pub fn snapshot_debounce(&self) -> Duration {
        Duration::from_millis(self.snapshot_debounce_ms)
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            project_id: default_project_id(),
            tree_id: default_tree_id(),
            sync_interval_ms: default_sync_interval_ms(),
            undo_levels: default_undo_levels(),
            drop_edge_threshold: default_drop_edge_threshold(),
            snapshot_debounce_ms: default_snapshot_debounce_ms(),
        }
    }
}
