//! Editor configuration
//!
//! Stored as TOML at `<config_dir>/prompt-chain/config.toml`. Every field has
//! a serde default so older or hand-trimmed files keep loading; a missing
//! file is created with defaults on first run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::{config, drag};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Overrides the storage directory of the file-backed store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
    #[serde(default)]
    pub drag: DragSettings,
}

/// Gesture tuning for the drag controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragSettings {
    #[serde(default = "default_threshold_px")]
    pub threshold_px: f32,
    #[serde(default = "default_autoscroll_margin_px")]
    pub autoscroll_margin_px: f32,
    #[serde(default = "default_autoscroll_interval_ms")]
    pub autoscroll_interval_ms: u64,
    #[serde(default = "default_autoscroll_step_px")]
    pub autoscroll_step_px: f32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_threshold_px() -> f32 {
    drag::THRESHOLD_PX
}

fn default_autoscroll_margin_px() -> f32 {
    drag::AUTOSCROLL_MARGIN_PX
}

fn default_autoscroll_interval_ms() -> u64 {
    drag::AUTOSCROLL_INTERVAL_MS
}

fn default_autoscroll_step_px() -> f32 {
    drag::AUTOSCROLL_STEP_PX
}

impl Default for DragSettings {
    fn default() -> Self {
        Self {
            threshold_px: default_threshold_px(),
            autoscroll_margin_px: default_autoscroll_margin_px(),
            autoscroll_interval_ms: default_autoscroll_interval_ms(),
            autoscroll_step_px: default_autoscroll_step_px(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            storage_dir: None,
            drag: DragSettings::default(),
        }
    }
}

impl EditorConfig {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(config::APP_DIR);
        path.push(config::FILENAME);
        path
    }

    /// Load from the default location, creating it when absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Config file not found, creating default config at {:?}", path);
            let config = EditorConfig::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let mut config: EditorConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from {:?}", path))?;
        config.validate_and_clamp();

        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(path, toml_string).with_context(|| format!("Failed to write config to {:?}", path))?;

        info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Storage directory to use for the file-backed store
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(crate::storage::FileStore::default_dir)
    }

    fn validate_and_clamp(&mut self) {
        let drag = &mut self.drag;
        if !(0.0..=100.0).contains(&drag.threshold_px) {
            warn!(threshold_px = drag.threshold_px, "Drag threshold out of range, clamping");
            drag.threshold_px = drag.threshold_px.clamp(0.0, 100.0);
        }
        if !(0.0..=500.0).contains(&drag.autoscroll_margin_px) {
            warn!(margin = drag.autoscroll_margin_px, "Auto-scroll margin out of range, clamping");
            drag.autoscroll_margin_px = drag.autoscroll_margin_px.clamp(0.0, 500.0);
        }
        if drag.autoscroll_interval_ms == 0 {
            warn!("Auto-scroll interval of 0ms, using default");
            drag.autoscroll_interval_ms = default_autoscroll_interval_ms();
        }
        if drag.autoscroll_step_px <= 0.0 || drag.autoscroll_step_px.is_nan() {
            warn!(step = drag.autoscroll_step_px, "Auto-scroll step must be positive, using default");
            drag.autoscroll_step_px = default_autoscroll_step_px();
        }
        // NaN fails the range checks above but survives clamp
        if drag.threshold_px.is_nan() {
            drag.threshold_px = default_threshold_px();
        }
        if drag.autoscroll_margin_px.is_nan() {
            drag.autoscroll_margin_px = default_autoscroll_margin_px();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub/config.toml");

        let config = EditorConfig::load_from(&path).unwrap();

        assert_eq!(config, EditorConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "log_level = \"debug\"\n[drag]\nthreshold_px = 8.0\n").unwrap();

        let config = EditorConfig::load_from(&path).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.drag.threshold_px, 8.0);
        assert_eq!(config.drag.autoscroll_interval_ms, drag::AUTOSCROLL_INTERVAL_MS);
        assert_eq!(config.storage_dir, None);
    }

    #[test]
    fn test_out_of_range_values_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[drag]\nthreshold_px = 900.0\nautoscroll_interval_ms = 0\nautoscroll_step_px = -3.0\n",
        )
        .unwrap();

        let config = EditorConfig::load_from(&path).unwrap();

        assert_eq!(config.drag.threshold_px, 100.0);
        assert_eq!(config.drag.autoscroll_interval_ms, drag::AUTOSCROLL_INTERVAL_MS);
        assert_eq!(config.drag.autoscroll_step_px, drag::AUTOSCROLL_STEP_PX);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "log_level = [").unwrap();

        assert!(EditorConfig::load_from(&path).is_err());
    }
}
