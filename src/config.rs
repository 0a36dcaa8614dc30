//! Configuration management for git-publish.
//!
//! Supports layered configuration: defaults → user file → env. The
//! persisted record is the flat key/value set the tool has always used:
//! repo_path, git_url, branch, file_pattern, connection_type, github_token.

use crate::domain::{ConnectionMode, RepositoryTarget};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persisted settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub repo_path: String,
    #[serde(default)]
    pub git_url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    #[serde(default)]
    pub connection_type: ConnectionMode,
    #[serde(default)]
    pub github_token: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repo_path: String::new(),
            git_url: String::new(),
            branch: default_branch(),
            file_pattern: default_file_pattern(),
            connection_type: ConnectionMode::default(),
            github_token: String::new(),
        }
    }
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_file_pattern() -> String {
    ".".to_string()
}

impl Settings {
    /// Load configuration with hierarchy: defaults → user file → env
    /// (GIT_PUBLISH_* variables).
    pub fn load() -> Result<Self, ConfigError> {
        use config::{Config, Environment, File};

        let mut builder = Config::builder();

        if let Some(path) = Self::user_config_path() {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(Environment::with_prefix("GIT_PUBLISH").try_parsing(true));

        let config = builder
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Persist to the user config file, creating it if needed.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::user_config_path().ok_or(ConfigError::NoConfigDir)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// User config file (~/.config/git-publish/config.json or platform
    /// equivalent).
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "git-publish", "git-publish")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Build the explicit target the workflow consumes. Required fields
    /// must be present by this point.
    pub fn to_target(&self) -> Result<RepositoryTarget, ConfigError> {
        if self.repo_path.trim().is_empty() {
            return Err(ConfigError::MissingField("repo_path"));
        }
        if self.git_url.trim().is_empty() {
            return Err(ConfigError::MissingField("git_url"));
        }
        if self.branch.trim().is_empty() {
            return Err(ConfigError::MissingField("branch"));
        }

        let token = self.github_token.trim();
        Ok(RepositoryTarget {
            local_path: PathBuf::from(self.repo_path.trim()),
            remote_url: self.git_url.clone(),
            branch: self.branch.trim().to_string(),
            file_pattern: if self.file_pattern.trim().is_empty() {
                default_file_pattern()
            } else {
                self.file_pattern.trim().to_string()
            },
            mode: self.connection_type,
            token: if token.is_empty() {
                None
            } else {
                Some(token.to_string())
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.branch, "main");
        assert_eq!(settings.file_pattern, ".");
        assert_eq!(settings.connection_type, ConnectionMode::Ssh);
        assert!(settings.github_token.is_empty());
    }

    #[test]
    fn json_roundtrip_preserves_the_flat_record() {
        let settings = Settings {
            repo_path: "/home/u/project".to_string(),
            git_url: "git@github.com:u/r.git".to_string(),
            branch: "main".to_string(),
            file_pattern: ".".to_string(),
            connection_type: ConnectionMode::Https,
            github_token: "ghp_x".to_string(),
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"connection_type\":\"https\""));
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let back: Settings = serde_json::from_str(r#"{"repo_path": "/p"}"#).unwrap();
        assert_eq!(back.repo_path, "/p");
        assert_eq!(back.branch, "main");
        assert_eq!(back.connection_type, ConnectionMode::Ssh);
    }

    #[test]
    fn to_target_requires_path_and_url() {
        let settings = Settings::default();
        assert!(matches!(
            settings.to_target(),
            Err(ConfigError::MissingField("repo_path"))
        ));

        let settings = Settings {
            repo_path: "/p".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            settings.to_target(),
            Err(ConfigError::MissingField("git_url"))
        ));
    }

    #[test]
    fn to_target_drops_blank_token() {
        let settings = Settings {
            repo_path: "/p".to_string(),
            git_url: "git@github.com:u/r.git".to_string(),
            github_token: "  ".to_string(),
            ..Settings::default()
        };
        let target = settings.to_target().unwrap();
        assert_eq!(target.token, None);
        assert_eq!(target.file_pattern, ".");
    }
}
