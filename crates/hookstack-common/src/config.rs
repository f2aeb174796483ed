//! Global configuration model for hookstack.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{HookstackError, Result};

/// Root configuration shared by the composer, engines, and CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookstackConfig {
    /// Directory synthesized templates are written to.
    pub out_dir: PathBuf,
    /// Region used for generated identities and URLs.
    pub region: String,
    /// Account used for generated identities.
    pub account: String,
    /// Memory range accepted for compute units.
    pub memory_bounds: MemoryBounds,
}

impl Default for HookstackConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(crate::constants::DEFAULT_OUT_DIR),
            region: crate::constants::DEFAULT_REGION.to_string(),
            account: crate::constants::DEFAULT_ACCOUNT.to_string(),
            memory_bounds: MemoryBounds::default(),
        }
    }
}

impl HookstackConfig {
    /// Loads a configuration file. `.json` files are read as JSON, anything
    /// else as YAML. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// memory bounds are inverted.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| HookstackError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        config.memory_bounds.validate()?;
        Ok(config)
    }
}

/// Inclusive memory range, in MB, a compute unit may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBounds {
    /// Smallest accepted value.
    pub min_mb: u32,
    /// Largest accepted value.
    pub max_mb: u32,
}

impl Default for MemoryBounds {
    fn default() -> Self {
        Self {
            min_mb: crate::constants::MIN_MEMORY_MB,
            max_mb: crate::constants::MAX_MEMORY_MB,
        }
    }
}

impl MemoryBounds {
    /// Returns the bounds as a range.
    #[must_use]
    pub fn range(&self) -> RangeInclusive<u32> {
        self.min_mb..=self.max_mb
    }

    /// Returns whether `memory_mb` falls inside the bounds.
    #[must_use]
    pub fn contains(&self, memory_mb: u32) -> bool {
        self.range().contains(&memory_mb)
    }

    fn validate(&self) -> Result<()> {
        if self.min_mb > self.max_mb {
            return Err(HookstackError::Config {
                message: format!(
                    "memory_bounds.min_mb ({}) exceeds memory_bounds.max_mb ({})",
                    self.min_mb, self.max_mb
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_provider_limits() {
        let config = HookstackConfig::default();
        assert!(config.memory_bounds.contains(128));
        assert!(config.memory_bounds.contains(10_240));
        assert!(!config.memory_bounds.contains(127));
        assert!(!config.memory_bounds.contains(100_000));
    }

    #[test]
    fn load_yaml_fills_missing_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hookstack.yaml");
        std::fs::write(&path, "region: eu-west-1\n").expect("write");

        let config = HookstackConfig::load(&path).expect("load");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.account, crate::constants::DEFAULT_ACCOUNT);
        assert_eq!(config.memory_bounds, MemoryBounds::default());
    }

    #[test]
    fn load_json_by_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"account": "252703795646"}"#).expect("write");

        let config = HookstackConfig::load(&path).expect("load");
        assert_eq!(config.account, "252703795646");
    }

    #[test]
    fn load_rejects_inverted_bounds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "memory_bounds:\n  min_mb: 512\n  max_mb: 256\n").expect("write");

        let err = HookstackConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("exceeds"), "got: {err}");
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = HookstackConfig::load(Path::new("/nonexistent/hookstack.yaml")).unwrap_err();
        assert!(matches!(err, HookstackError::Io { .. }));
    }
}
