//! Asset runtime configuration
//!
//! Supports loading and saving in RON (Rusty Object Notation) or JSON format.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Asset runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Root of the on-disk resource folder
    pub resources_root: PathBuf,
    /// `env_logger` filter used by the demo binary
    pub log_filter: String,
    /// Frames an in-memory backend takes to complete an asynchronous operation
    pub async_latency_frames: u32,
    /// Upper bound of frames spent waiting for tasks to settle
    pub max_frames_per_wait: u32,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            resources_root: PathBuf::from("Resources"),
            log_filter: String::from("info"),
            async_latency_frames: 1,
            max_frames_per_wait: 600,
        }
    }
}

impl AssetConfig {
    /// Set the resource folder root
    pub fn with_resources_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resources_root = root.into();
        self
    }

    /// Set the log filter
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Set the simulated asynchronous latency
    pub fn with_async_latency(mut self, frames: u32) -> Self {
        self.async_latency_frames = frames;
        self
    }

    /// Set the wait limit in frames
    pub fn with_max_frames_per_wait(mut self, frames: u32) -> Self {
        self.max_frames_per_wait = frames;
        self
    }

    /// Save the config to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        fs::write(path, ron_string).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load the config from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        ron::from_str(&content).map_err(|e| ConfigError::DeserializeError(e.to_string()))
    }

    /// Save the config to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        fs::write(path, json_string).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load the config from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::DeserializeError(e.to_string()))
    }

    /// Load from a `.ron` or `.json` file, picked by extension
    ///
    /// # Errors
    ///
    /// Returns an error for any other extension or if loading fails
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => Self::load_ron(path),
            Some("json") => Self::load_json(path),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Errors that can occur during config operations
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// IO error
    IoError(String),
    /// Serialization error
    SerializeError(String),
    /// Deserialization error
    DeserializeError(String),
    /// File extension is neither `.ron` nor `.json`
    UnsupportedFormat(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::SerializeError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializeError(e) => write!(f, "Deserialization error: {e}"),
            Self::UnsupportedFormat(path) => write!(f, "Unsupported config format: {path}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_ron_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.ron");
        let config = AssetConfig::default()
            .with_resources_root("content/Resources")
            .with_async_latency(3);

        config.save_ron(&path).unwrap();
        let loaded = AssetConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AssetConfig = ron::from_str("(log_filter: \"debug\")").unwrap();
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.max_frames_per_wait, 600);

        let config: AssetConfig = serde_json::from_str("{\"async_latency_frames\": 0}").unwrap();
        assert_eq!(config.async_latency_frames, 0);
        assert_eq!(config.resources_root, PathBuf::from("Resources"));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = AssetConfig::load("assets.toml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
