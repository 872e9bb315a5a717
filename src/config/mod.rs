//! Configuration management for batchresize

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{Result, ResizeError};
use crate::processing::ScaleFactor;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Batch resize settings
    pub resize: ResizeConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Settings for one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    /// Multiplier applied to both width and height
    pub scale: f64,

    /// Fan the batch out over worker tasks instead of a sequential loop
    pub concurrent: bool,

    /// Upper bound on transforms in flight (None = logical CPU count)
    pub max_concurrent: Option<usize>,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            scale: 0.5,
            concurrent: true,
            max_concurrent: None,
        }
    }
}

impl ResizeConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scale factor
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Enable or disable concurrent mode
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Bound the number of transforms in flight
    pub fn max_concurrent(mut self, max: Option<usize>) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Validated scale factor
    pub fn scale_factor(&self) -> Result<ScaleFactor> {
        ScaleFactor::new(self.scale)
    }

    /// Validate resize settings
    pub fn validate(&self) -> Result<()> {
        self.scale_factor()?;
        if self.max_concurrent == Some(0) {
            return Err(ResizeError::config(
                "max_concurrent must be greater than 0"
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ResizeError::config(
                format!("Failed to read config file {:?}: {}", path.as_ref(), e)
            ))?;

        let config: Self = match extension_of(path.as_ref()).as_str() {
            "toml" => toml::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            _ => return Err(ResizeError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = match extension_of(path.as_ref()).as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| ResizeError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| ResizeError::config(format!("YAML serialization failed: {}", e)))?,
            _ => return Err(ResizeError::config(
                "Unsupported config file format. Use .toml or .yaml"
            )),
        };

        std::fs::write(&path, content)
            .map_err(|e| ResizeError::config(
                format!("Failed to write config file {:?}: {}", path.as_ref(), e)
            ))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.resize.validate()
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.resize.scale, 0.5);
        assert!(config.resize.concurrent);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_io() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            resize: ResizeConfig::new().scale(0.25).concurrent(false),
            logging: LoggingConfig::default(),
        };

        let toml_path = dir.path().join("batch.toml");
        config.to_file(&toml_path).unwrap();
        let loaded = Config::from_file(&toml_path).unwrap();
        assert_eq!(loaded.resize.scale, 0.25);
        assert!(!loaded.resize.concurrent);

        let yaml_path = dir.path().join("batch.yml");
        config.to_file(&yaml_path).unwrap();
        let loaded = Config::from_file(&yaml_path).unwrap();
        assert_eq!(loaded.resize.scale, 0.25);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[resize]\nscale = 0.75\n").unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.resize.scale, 0.75);
        assert!(loaded.resize.concurrent);
        assert_eq!(loaded.logging.level, "info");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ResizeConfig::new().scale(0.0).validate().is_err());
        assert!(ResizeConfig::new().scale(-1.0).validate().is_err());
        assert!(ResizeConfig::new().max_concurrent(Some(0)).validate().is_err());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[resize]\nscale = -2.0\n").unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ResizeError::Config { .. })));
    }
}
