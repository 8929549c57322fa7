//! Configuration for the CLI and the HTTP adapter.
//!
//! Every field has a default, so a TOML file only needs the keys it changes.
//! Command-line flags and `CROPGUARD_*` environment variables are applied on
//! top by the binaries.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::evaluation::DEFAULT_TEST_DIR;
use crate::inference::DEFAULT_TOP_K;
use crate::utils::error::{Error, Result};

/// Default checkpoint location, relative to the working directory
pub const DEFAULT_CHECKPOINT: &str = "leafnet_plantvillage.mpk";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Checkpoint holding model parameters and class names
    pub checkpoint: PathBuf,
    /// Ranked predictions returned per image
    pub top_k: usize,
    pub evaluation: EvaluationConfig,
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            checkpoint: PathBuf::from(DEFAULT_CHECKPOINT),
            top_k: DEFAULT_TOP_K,
            evaluation: EvaluationConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Batch evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Flat directory of `<ClassName><digits>.<ext>` images
    pub test_dir: PathBuf,
    /// Classify files on the rayon pool
    pub parallel: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from(DEFAULT_TEST_DIR),
            parallel: false,
        }
    }
}

/// HTTP adapter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl AppConfig {
    /// Load from a TOML file, or defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: AppConfig = match path {
            Some(path) => load_toml_config(path)?,
            None => AppConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.checkpoint.as_os_str().is_empty() {
            return Err(Error::Config("checkpoint path is empty".to_string()));
        }
        if self.server.host.is_empty() {
            return Err(Error::Config("server host is empty".to_string()));
        }
        Ok(())
    }
}

/// Read and deserialize a TOML file
pub fn load_toml_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config {}: {e}", path.display())))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.top_k, 3);
        assert_eq!(config.evaluation.test_dir, PathBuf::from("test/test_renamed"));
        assert!(!config.evaluation.parallel);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cropguard.toml");
        fs::write(
            &path,
            r#"
checkpoint = "models/leafnet.mpk"

[evaluation]
parallel = true

[server]
port = 9000
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();

        assert_eq!(config.checkpoint, PathBuf::from("models/leafnet.mpk"));
        assert!(config.evaluation.parallel);
        assert_eq!(config.evaluation.test_dir, PathBuf::from("test/test_renamed"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.top_k, 3);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "top_k = \"three\"").unwrap();

        assert!(matches!(AppConfig::load(Some(&path)), Err(Error::Config(_))));
        assert!(matches!(
            AppConfig::load(Some(&temp_dir.path().join("absent.toml"))),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_empty_checkpoint_fails_validation() {
        let config = AppConfig {
            checkpoint: PathBuf::new(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
