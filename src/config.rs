use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::tftp::client::config::ClientConfig;

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = ".tftpc.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientConfig>,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads `explicit` if given (it must exist), otherwise `.tftpc.toml`
    /// from the working directory when present.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Option<Self>> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Configuration file {} does not exist", path.display());
                }
                path.to_path_buf()
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !path.exists() {
                    return Ok(None);
                }
                path
            }
        };

        let config = Self::load_from_file(&path)?;
        let abs_path = fs::canonicalize(&path).unwrap_or(path);
        info!("Using configuration file: {}", abs_path.display());
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_load_client_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "[client]\ntimeout = \"2s\"\nretries = 5\nbind = \"0.0.0.0\"\n",
        )
        .unwrap();

        let config = AppConfig::discover(Some(&path)).unwrap().unwrap();
        let client = config.client.unwrap();
        assert_eq!(client.timeout, Some(Duration::from_secs(2)));
        assert_eq!(client.retries, Some(5));
        assert_eq!(client.bind.as_deref(), Some("0.0.0.0"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(AppConfig::discover(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[client\nretries = ").unwrap();
        assert!(AppConfig::load_from_file(&path).is_err());
    }

    #[test]
    #[serial]
    fn test_discover_in_working_directory() {
        let dir = TempDir::new().unwrap();
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let absent = AppConfig::discover(None).unwrap();
        fs::write(DEFAULT_CONFIG_FILE, "[client]\nretries = 7\n").unwrap();
        let present = AppConfig::discover(None).unwrap();

        std::env::set_current_dir(previous).unwrap();

        assert!(absent.is_none());
        assert_eq!(present.unwrap().client.unwrap().retries, Some(7));
    }
}
