//! Configuration system.
//!
//! Loads engine configuration from JSON strings/files.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Root configuration of the engine and its host loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory scanned for host documents (`*.json`).
    #[serde(default = "default_asset_dir")]
    pub asset_dir: String,
    /// Frame clock rate of the host loop.
    #[serde(default = "default_frame_hz")]
    pub frame_hz: u32,
    /// How many frames pass between two scans of `asset_dir`.
    #[serde(default = "default_poll_interval_frames")]
    pub poll_interval_frames: u32,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Stop after this many frames; runs until interrupted when absent.
    #[serde(default)]
    pub max_frames: Option<u64>,
    /// Scene made current once the first asset scan completed.
    #[serde(default)]
    pub scene: Option<String>,
}

fn default_asset_dir() -> String {
    "assets".to_string()
}

fn default_frame_hz() -> u32 {
    60
}

fn default_poll_interval_frames() -> u32 {
    30
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            asset_dir: default_asset_dir(),
            frame_hz: default_frame_hz(),
            poll_interval_frames: default_poll_interval_frames(),
            log_filter: default_log_filter(),
            max_frames: None,
            scene: None,
        }
    }
}

impl EngineConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and parses a config file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Seconds per frame; a zero rate is treated as 1 Hz.
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.frame_hz.max(1)))
    }
}
