/// Companion configuration, loaded from a JSON file.
///
/// Every field is optional in the file; missing fields take the defaults
/// of [`CompanionConfig::new`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::alert::DEFAULT_COOLDOWN_MS;
use crate::error::{Error, Result};

pub const DEFAULT_STORE_FILE: &str = "detections.json";
pub const DEFAULT_BLOCKLIST_FILE: &str = "blocklist.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompanionConfig {
    /// Directory holding the store and blocklist files. Current directory
    /// if unset.
    pub data_dir: Option<PathBuf>,
    /// Store file name, relative to `data_dir`
    pub store_file: Option<PathBuf>,
    /// Blocklist file name, relative to `data_dir`
    pub blocklist_file: Option<PathBuf>,
    /// Quiet period between alerts for one device
    pub alert_cooldown_ms: u64,
    /// Cap on a partial frame; unbounded if unset
    pub max_buffer_len: Option<usize>,
    /// Detections weaker than this (dBm) are aggregated but never alert
    pub min_rssi: Option<i32>,
}

impl CompanionConfig {
    pub const fn new() -> Self {
        Self {
            data_dir: None,
            store_file: None,
            blocklist_file: None,
            alert_cooldown_ms: DEFAULT_COOLDOWN_MS,
            max_buffer_len: None,
            min_rssi: None,
        }
    }

    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: Self = serde_json::from_str(&text).map_err(|e| Error::json(path, e))?;
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_buffer_len == Some(0) {
            return Err(Error::Config("max_buffer_len must be positive".into()));
        }
        Ok(())
    }

    fn data_dir(&self) -> &Path {
        self.data_dir.as_deref().unwrap_or(Path::new("."))
    }

    pub fn store_path(&self) -> PathBuf {
        let file = self
            .store_file
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_STORE_FILE));
        self.data_dir().join(file)
    }

    pub fn blocklist_path(&self) -> PathBuf {
        let file = self
            .blocklist_file
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_BLOCKLIST_FILE));
        self.data_dir().join(file)
    }

    /// Whether a detection at `rssi` may raise an alert.
    pub fn rssi_may_alert(&self, rssi: i32) -> bool {
        self.min_rssi.map_or(true, |min| rssi >= min)
    }
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self::new()
    }
}
