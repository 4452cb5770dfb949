//! Catalog configuration
//!
//! All fields have defaults, so an empty (or missing) config file is valid.
//!
//! ```toml
//! database_path = "/home/me/closet.db"
//!
//! [image]
//! max_width = 1024
//! quality = 0.75
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::photo::ImageSettings;
use crate::state::library::default_db_path;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "MY_CLOSET_CONFIG";

/// Environment variable overriding the database path
pub const DB_ENV: &str = "MY_CLOSET_DB";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub database_path: PathBuf,
    pub image: ImageSettings,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            database_path: default_db_path(),
            image: ImageSettings::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl CatalogConfig {
    /// Load the config from `path`, else from `$MY_CLOSET_CONFIG`, else defaults.
    /// `$MY_CLOSET_DB` always wins for the database path.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(db) = std::env::var_os(DB_ENV) {
            config.database_path = PathBuf::from(db);
        }

        config.validate()?;
        debug!("Using catalog database {}", config.database_path.display());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let image = &self.image;
        if image.max_width == 0 {
            return Err(ConfigError::Invalid("image.max_width must be positive".into()));
        }
        if !(0.0..=1.0).contains(&image.quality) {
            return Err(ConfigError::Invalid(format!(
                "image.quality must be between 0.0 and 1.0, got {}",
                image.quality
            )));
        }
        if image.allowed_types.is_empty() {
            return Err(ConfigError::Invalid("image.allowed_types is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::codec::{DEFAULT_MAX_WIDTH, MAX_FILE_SIZE};

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = CatalogConfig::from_toml("").unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.image.max_width, DEFAULT_MAX_WIDTH);
        assert_eq!(config.image.max_file_size, MAX_FILE_SIZE);
        assert!(config.database_path.ends_with("my_closet.db"));
    }

    #[test]
    fn test_partial_image_section() {
        let config = CatalogConfig::from_toml(
            r#"
            database_path = "/tmp/closet.db"

            [image]
            max_width = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/closet.db"));
        assert_eq!(config.image.max_width, 1024);
        assert_eq!(config.image.quality, 0.8);
        assert_eq!(config.image.allowed_types.len(), 4);
    }

    #[test]
    fn test_validate_rejects_bad_quality() {
        let mut config = CatalogConfig::default();
        config.image.quality = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.image.quality = 0.5;
        config.image.max_width = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_file_missing() {
        let err = CatalogConfig::from_file(Path::new("/nonexistent/closet.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_from_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("closet.toml");
        std::fs::write(&path, "[image]\nquality = 0.6\n").unwrap();

        let config = CatalogConfig::from_file(&path).unwrap();
        assert_eq!(config.image.quality, 0.6);
    }
}
