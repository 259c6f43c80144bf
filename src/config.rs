//! Engine configuration
//!
//! Loaded from `config.toml` in the taskmatch data directory. Missing files
//! and missing keys fall back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::error::{MatchError, Result};

/// Which classifier backs intent/entity extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Returns no intents or entities; scoring is purely lexical
    #[default]
    Mock,
    /// Vocabulary-driven intents and entities
    Keyword,
}

impl std::str::FromStr for ClassifierKind {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(ClassifierKind::Mock),
            "keyword" => Ok(ClassifierKind::Keyword),
            other => Err(MatchError::Config(format!("unknown classifier '{other}'"))),
        }
    }
}

/// Cache sizing shared by every logical cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live in seconds
    pub ttl_secs: u64,
    /// Maximum entries per cache
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL.as_secs(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Locale passed to the classifier
    pub locale: String,
    /// Classifier variant
    pub classifier: ClassifierKind,
    /// Deadline for a single classifier call; none means wait forever
    pub classifier_timeout_ms: Option<u64>,
    /// Default threshold for "find similar tasks"
    pub similar_threshold: f64,
    /// Default threshold for duplicate clustering
    pub duplicate_threshold: f64,
    /// Cache sizing
    pub cache: CacheConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
            classifier: ClassifierKind::Mock,
            classifier_timeout_ms: None,
            similar_threshold: 0.6,
            duplicate_threshold: 0.7,
            cache: CacheConfig::default(),
        }
    }
}

impl MatchConfig {
    pub fn classifier_timeout(&self) -> Option<Duration> {
        self.classifier_timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("similar_threshold", self.similar_threshold),
            ("duplicate_threshold", self.duplicate_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MatchError::Config(format!("{name} must be within [0, 1], got {value}")));
            }
        }
        if self.cache.capacity == 0 {
            return Err(MatchError::Config("cache.capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Load configuration from a TOML file, or defaults if it does not exist
pub fn load_config(config_path: &Path) -> Result<MatchConfig> {
    if !config_path.exists() {
        return Ok(MatchConfig::default());
    }

    let content = std::fs::read_to_string(config_path)?;
    let config: MatchConfig =
        toml::from_str(&content).map_err(|e| MatchError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Data directory: `./.taskmatch` if present, else `~/.taskmatch`
pub fn data_dir() -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let project_dir = cwd.join(".taskmatch");
    if project_dir.exists() {
        return Ok(project_dir);
    }

    let home = dirs::home_dir()
        .ok_or_else(|| MatchError::Config("could not find home directory".to_string()))?;
    Ok(home.join(".taskmatch"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = MatchConfig::default();
        assert_eq!(config.locale, "en");
        assert_eq!(config.classifier, ClassifierKind::Mock);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.cache.capacity, 1000);
        assert!(config.classifier_timeout().is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join("nope.toml")).unwrap();
        assert_eq!(config.duplicate_threshold, 0.7);
    }

    #[test]
    fn test_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "classifier = \"keyword\"\nclassifier_timeout_ms = 250\n\n[cache]\nttl_secs = 60\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.classifier, ClassifierKind::Keyword);
        assert_eq!(config.classifier_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.capacity, 1000);
        assert_eq!(config.similar_threshold, 0.6);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "duplicate_threshold = 1.5\n").unwrap();
        assert!(matches!(load_config(&path), Err(MatchError::Config(_))));
    }

    #[test]
    fn test_classifier_kind_from_str() {
        assert_eq!("Keyword".parse::<ClassifierKind>().unwrap(), ClassifierKind::Keyword);
        assert!("neural".parse::<ClassifierKind>().is_err());
    }
}
