//! Provider configuration: where the server is and who we talk to it as
//!
//! Later sources win: built-in defaults, then the TOML config file, then the
//! `IQ_SERVER_*` environment variables.

use anyhow::{Context, Result, bail};
use iqclient::Credentials;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_URL: &str = "http://localhost:8070";

pub const ENV_URL: &str = "IQ_SERVER_URL";
pub const ENV_USERNAME: &str = "IQ_SERVER_USERNAME";
pub const ENV_PASSWORD: &str = "IQ_SERVER_PASSWORD";

/// Get the config directory path (~/.config/iqform)
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("iqform"))
}

/// Settings as written in the config file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

/// Resolved provider settings
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: None,
            password: None,
        }
    }
}

impl ProviderConfig {
    /// Resolve settings from the config file and the process environment
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::resolve(path, |key| std::env::var(key).ok())
    }

    /// Resolve settings with a custom environment lookup
    pub fn resolve(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let default = config_dir().ok().map(|dir| dir.join("config.toml"));
        Self::resolve_from(path, default.as_deref(), env)
    }

    /// Resolve settings against an explicit default config location
    ///
    /// Without a default location (no home directory) only the explicit
    /// file and the environment are consulted.
    fn resolve_from(
        path: Option<&Path>,
        default: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        let file = match (path, default) {
            (Some(path), _) => {
                let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
                Some(read_file(&expanded)?)
            }
            (None, Some(default)) if default.exists() => Some(read_file(default)?),
            (None, Some(default)) => {
                log::debug!("No config file at {}", default.display());
                None
            }
            (None, None) => {
                log::debug!("No home directory, skipping default config file");
                None
            }
        };

        if let Some(file) = file {
            config.merge(file.url, file.username, file.password);
        }
        config.merge(env(ENV_URL), env(ENV_USERNAME), env(ENV_PASSWORD));

        log::debug!("Resolved provider config: {config:?}");
        Ok(config)
    }

    fn merge(&mut self, url: Option<String>, username: Option<String>, password: Option<String>) {
        if let Some(url) = url.filter(|v| !v.is_empty()) {
            self.url = url;
        }
        if let Some(username) = username.filter(|v| !v.is_empty()) {
            self.username = Some(username);
        }
        if let Some(password) = password.filter(|v| !v.is_empty()) {
            self.password = Some(password);
        }
    }

    /// Credentials for remote calls; both parts are required
    pub fn credentials(&self) -> Result<Credentials> {
        let Some(username) = &self.username else {
            bail!("No username configured (set {ENV_USERNAME} or `username` in the config file)");
        };
        let Some(password) = &self.password else {
            bail!("No password configured (set {ENV_PASSWORD} or `password` in the config file)");
        };
        Ok(Credentials::new(username.clone(), password.clone()))
    }
}

fn read_file(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let file: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    log::debug!("Loaded config from {}", path.display());
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "url = \"https://iq.example.com\"\nusername = \"admin\"\n");

        let config = ProviderConfig::resolve(Some(&path), env(&[])).unwrap();
        assert_eq!(config.url, "https://iq.example.com");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert!(config.password.is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "url = \"https://file\"\nusername = \"file-user\"\n");

        let config = ProviderConfig::resolve(
            Some(&path),
            env(&[
                (ENV_URL, "https://env"),
                (ENV_PASSWORD, "pw"),
                (ENV_USERNAME, ""),
            ]),
        )
        .unwrap();
        assert_eq!(config.url, "https://env");
        assert_eq!(config.username.as_deref(), Some("file-user"));
        assert_eq!(config.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(ProviderConfig::resolve(Some(&missing), env(&[])).is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "uri = \"typo\"\n");
        assert!(ProviderConfig::resolve(Some(&path), env(&[])).is_err());
    }

    #[test]
    fn test_env_alone_without_home_directory() {
        let config = ProviderConfig::resolve_from(
            None,
            None,
            env(&[
                (ENV_URL, "https://env"),
                (ENV_USERNAME, "admin"),
                (ENV_PASSWORD, "admin123"),
            ]),
        )
        .unwrap();
        assert_eq!(config.url, "https://env");
        assert!(config.credentials().is_ok());
    }

    #[test]
    fn test_missing_default_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let default = dir.path().join("config.toml");
        let config = ProviderConfig::resolve_from(None, Some(&default), env(&[])).unwrap();
        assert_eq!(config, ProviderConfig::default());
    }

    #[test]
    fn test_credentials_required() {
        let mut config = ProviderConfig::default();
        assert!(config.credentials().is_err());

        config.username = Some("admin".into());
        assert!(config.credentials().is_err());

        config.password = Some("admin123".into());
        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.username, "admin");
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ProviderConfig {
            password: Some("hunter2".into()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
