//! campusdesk configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ANALYTICS_TIMEOUT_SECS, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::{CampusError, CampusResult};

static DEFAULT_API_URL: &str = "http://localhost:3000";

/// Environment variable that overrides `api_url`.
pub const API_URL_ENV: &str = "CAMPUSDESK_API_URL";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_user_id() -> String {
    "1".to_string()
}

fn default_user_role() -> String {
    "admin".to_string()
}

fn default_request_timeout() -> String {
    format!("{DEFAULT_REQUEST_TIMEOUT_SECS}s")
}

fn default_analytics_timeout() -> String {
    format!("{DEFAULT_ANALYTICS_TIMEOUT_SECS}s")
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Configuration at ~/.config/campusdesk/config.toml
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CampusConfig {
    /// Base URL of the school API, without the `/api` suffix.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Identity sent in `x-user-id`. The API does its own authorization.
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Identity sent in `x-user-role`.
    #[serde(default = "default_user_role")]
    pub user_role: String,

    /// e.g. "30s"
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,

    #[serde(default = "default_analytics_timeout")]
    pub analytics_timeout: String,

    /// Page size for the student table.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for CampusConfig {
    fn default() -> Self {
        CampusConfig {
            api_url: default_api_url(),
            user_id: default_user_id(),
            user_role: default_user_role(),
            request_timeout: default_request_timeout(),
            analytics_timeout: default_analytics_timeout(),
            page_size: default_page_size(),
        }
    }
}

impl CampusConfig {
    pub fn config_dir() -> CampusResult<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| CampusError::Config("Could not determine config directory".into()))?
            .join("campusdesk"))
    }

    pub fn config_path() -> CampusResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load from the default path, then apply environment overrides.
    pub fn load() -> CampusResult<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_url = url;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> CampusResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CampusError::Config(format!("{}: {e}", path.display())))
    }

    pub fn validate(&self) -> CampusResult<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(CampusError::Config(format!(
                "api_url must start with http:// or https://, got '{}'",
                self.api_url
            )));
        }
        self.request_timeout()?;
        self.analytics_timeout()?;
        if self.page_size == 0 {
            return Err(CampusError::Config("page_size must be at least 1".into()));
        }
        Ok(())
    }

    /// Base URL with trailing slashes removed.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> CampusResult<Duration> {
        parse_timeout("request_timeout", &self.request_timeout)
    }

    pub fn analytics_timeout(&self) -> CampusResult<Duration> {
        parse_timeout("analytics_timeout", &self.analytics_timeout)
    }

    pub fn save_to(&self, path: &Path) -> CampusResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| CampusError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CampusError::Config(format!("Could not create config directory: {e}")))?;
        }
        std::fs::write(path, content)
            .map_err(|e| CampusError::Config(format!("Could not write config file: {e}")))?;
        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> CampusResult<()> {
        let contents = format!(
            "\
# campusdesk configuration

# School API base URL (can also be set with {API_URL_ENV}):
# api_url = \"{DEFAULT_API_URL}\"

# Identity headers sent with every request:
# user_id = \"1\"
# user_role = \"admin\"

# Request timeouts:
# request_timeout = \"{DEFAULT_REQUEST_TIMEOUT_SECS}s\"
# analytics_timeout = \"{DEFAULT_ANALYTICS_TIMEOUT_SECS}s\"

# Rows per page in the student table:
# page_size = {DEFAULT_PAGE_SIZE}
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CampusError::Config(format!("Could not create config directory: {e}")))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CampusError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

fn parse_timeout(name: &str, value: &str) -> CampusResult<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| CampusError::Config(format!("{name} '{value}' is not a duration: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CampusConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, CampusConfig::default());
        assert_eq!(config.request_timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(config.analytics_timeout().unwrap(), Duration::from_secs(15));
    }

    #[test]
    fn commented_default_file_parses_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        CampusConfig::create_default_config(&path).unwrap();
        assert_eq!(CampusConfig::load_from(&path).unwrap(), CampusConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_url = \"https://sis.school.test/\"\nrequest_timeout = \"5s\"\n").unwrap();
        let config = CampusConfig::load_from(&path).unwrap();
        assert_eq!(config.base_url(), "https://sis.school.test");
        assert_eq!(config.request_timeout().unwrap(), Duration::from_secs(5));
        assert_eq!(config.user_role, "admin");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let config = CampusConfig {
            api_url: "sis.school.test".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CampusConfig {
            analytics_timeout: "soon".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
