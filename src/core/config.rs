use crate::core::perceptual::HashAlgorithm;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default Hamming threshold; distances strictly below it are near-duplicates.
pub const DEFAULT_THRESHOLD: u32 = 5;
const MAX_THRESHOLD: u32 = 64;
const CONFIG_DIR_NAME: &str = "photodedup";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    Invalid { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub threshold: u32,
    pub extensions: Vec<String>,
    pub algorithm: HashAlgorithm,
    /// Fingerprinting threads
    pub workers: usize,
    /// Files fingerprinted ahead of classification
    pub batch_size: usize,
    pub follow_links: bool,
    pub exclude_patterns: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            extensions: vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()],
            algorithm: HashAlgorithm::default(),
            workers: num_cpus::get(),
            batch_size: 64,
            follow_links: false,
            exclude_patterns: Vec::new(),
        }
    }
}

impl ScanConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: ScanConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path if given, else the per-user config file when present,
    /// else defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => {
                log::info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold > MAX_THRESHOLD {
            return Err(ConfigError::Invalid {
                message: format!(
                    "threshold {} exceeds the {}-bit digest width",
                    self.threshold, MAX_THRESHOLD
                ),
            });
        }
        if self.extensions.iter().all(|ext| ext.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                message: "at least one file extension is required".to_string(),
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                message: "workers must be at least 1".to_string(),
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                message: "batch_size must be at least 1".to_string(),
            });
        }
        self.compiled_excludes()?;
        Ok(())
    }

    /// Lower-cased extensions without leading dots
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }

    pub fn compiled_excludes(&self) -> Result<Vec<Pattern>, ConfigError> {
        self.exclude_patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| ConfigError::Invalid {
                    message: format!("bad exclude pattern {:?}: {}", pattern, e),
                })
            })
            .collect()
    }
}

/// `<config dir>/photodedup/config.json`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.threshold, 5);
        assert_eq!(config.normalized_extensions(), vec!["png", "jpg", "jpeg"]);
        assert_eq!(config.algorithm, HashAlgorithm::Dct);
        assert!(config.workers >= 1);
        assert!(!config.follow_links);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{ "threshold": 8, "extensions": ["PNG", ".webp"] }"#).unwrap();

        let config = ScanConfig::load(&path).unwrap();
        assert_eq!(config.threshold, 8);
        assert_eq!(config.normalized_extensions(), vec!["png", "webp"]);
        assert_eq!(config.batch_size, ScanConfig::default().batch_size);
    }

    #[test]
    fn test_algorithm_parses_lowercase() {
        let config: ScanConfig = serde_json::from_str(r#"{ "algorithm": "gradient" }"#).unwrap();
        assert_eq!(config.algorithm, HashAlgorithm::Gradient);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ threshold: ").unwrap();

        assert!(matches!(ScanConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_explicit_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = ScanConfig::load_or_default(Some(&temp_dir.path().join("nope.json")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let too_wide = ScanConfig {
            threshold: 65,
            ..ScanConfig::default()
        };
        assert!(too_wide.validate().is_err());

        let no_exts = ScanConfig {
            extensions: vec![" ".to_string()],
            ..ScanConfig::default()
        };
        assert!(no_exts.validate().is_err());

        let no_workers = ScanConfig {
            workers: 0,
            ..ScanConfig::default()
        };
        assert!(no_workers.validate().is_err());

        let bad_glob = ScanConfig {
            exclude_patterns: vec!["[unclosed".to_string()],
            ..ScanConfig::default()
        };
        assert!(matches!(bad_glob.validate(), Err(ConfigError::Invalid { .. })));
    }
}
