use crate::api::DEFAULT_TIMEOUT_SECS;
use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "assetq";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub token_path: Option<PathBuf>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub environment: Option<String>,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::empty());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads the config file if one exists, then applies the environment.
    pub fn load_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::load(&path)?,
                _ => Self::empty(),
            },
        };
        config.apply_env_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn empty() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            ..Self::default()
        }
    }

    /// Environment wins over the file. The `NEXT_PUBLIC_API_URL` and
    /// `NODE_ENV` names are honored for deployments shared with the web app.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| lookup(k).filter(|v| !v.trim().is_empty()))
        };
        if let Some(url) = first(&["ASSETQ_API_URL", "NEXT_PUBLIC_API_URL"]) {
            self.api_url = Some(url);
        }
        if let Some(env) = first(&["ASSETQ_ENV", "NODE_ENV"]) {
            self.environment = Some(env);
        }
        if let Some(path) = first(&["ASSETQ_TOKEN_PATH"]) {
            self.token_path = Some(PathBuf::from(path));
        }
    }

    pub fn api_url(&self) -> Result<&str, ConfigError> {
        self.api_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingApiUrl)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn is_production(&self) -> bool {
        self.environment
            .as_deref()
            .is_some_and(|e| e.eq_ignore_ascii_case("production"))
    }

    pub fn token_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.token_path {
            Some(path) => Ok(path.clone()),
            None => default_token_path().ok_or(ConfigError::NoConfigDir),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.yaml"))
}

pub fn default_token_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "api_url: http://localhost:3001/api\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_url().unwrap(), "http://localhost:3001/api");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.is_production());
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Read { .. })));

        let bad = dir.path().join("bad.yaml");
        fs::write(&bad, "timeout_seconds: [1, 2]\n").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Parse { .. })));

        let empty = dir.path().join("empty.yaml");
        fs::write(&empty, "").unwrap();
        assert_eq!(Config::load(&empty).unwrap().timeout_seconds, 30);
    }

    #[test]
    fn test_env_overrides_with_fallback_names() {
        let mut config = Config {
            api_url: Some("http://file".into()),
            ..Config::empty()
        };
        config.apply_env_from(env(&[
            ("NEXT_PUBLIC_API_URL", "http://web"),
            ("NODE_ENV", "production"),
        ]));
        assert_eq!(config.api_url().unwrap(), "http://web");
        assert!(config.is_production());

        config.apply_env_from(env(&[
            ("ASSETQ_API_URL", "http://cli"),
            ("NEXT_PUBLIC_API_URL", "http://web"),
            ("ASSETQ_ENV", "development"),
        ]));
        assert_eq!(config.api_url().unwrap(), "http://cli");
        assert!(!config.is_production());
    }

    #[test]
    fn test_missing_api_url() {
        let mut config = Config::empty();
        config.apply_env_from(env(&[("ASSETQ_API_URL", "  ")]));
        assert!(matches!(config.api_url(), Err(ConfigError::MissingApiUrl)));
    }
}
