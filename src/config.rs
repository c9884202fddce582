//! Configuration management for the register client
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (openregister.toml)
//! - Environment variables (OPENREGISTER__*)
//!
//! ## Example config file (openregister.toml):
//! ```toml
//! [endpoint]
//! phase = "beta"
//!
//! [fetch]
//! page_size = 5000
//! format = "tsv"
//! timeout_secs = 30
//!
//! [cache]
//! kind = "disk"
//! dir = "./.register-cache"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{DiskCache, MemoryCache, PageCache};
use crate::error::{RegisterError, Result};
use crate::fetch::DEFAULT_PAGE_SIZE;
use crate::locator::Locator;
use crate::tabular::PageFormat;
use crate::transport::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

/// Main configuration for the register client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Which environment serves registers
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Paging and transport settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Page cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Endpoint configuration; both fields absent selects production
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Phase tag, e.g. "alpha" or "beta"
    #[serde(default)]
    pub phase: Option<String>,

    /// Base-URL template containing "register"
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default)]
    pub format: PageFormat,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Kind of page cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    #[default]
    None,
    Memory,
    Disk,
}

/// Cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub kind: CacheKind,

    /// Directory of the disk cache; defaults to the user cache directory
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

// Default value functions
fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            format: PageFormat::default(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "openregister.toml",
            ".openregister.toml",
            "config/openregister.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = project_dirs() {
            let xdg_config = dirs.config_dir().join("openregister.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // OPENREGISTER__FETCH__PAGE_SIZE=5000
        builder = builder.add_source(
            Environment::with_prefix("OPENREGISTER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Locator selected by the endpoint section
    pub fn locator(&self) -> Result<Locator> {
        match (&self.endpoint.phase, &self.endpoint.base_url) {
            (None, None) => Ok(Locator::Production),
            (Some(phase), None) => Ok(Locator::phase(phase.clone())),
            (None, Some(base_url)) => Locator::base_url(base_url.clone()),
            (Some(_), Some(_)) => Err(RegisterError::InvalidLocator(
                "endpoint sets both phase and base_url".to_string(),
            )),
        }
    }

    /// Directory of the disk cache
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache
            .dir
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.cache_dir().to_path_buf()))
    }

    /// Build the configured page cache, if any
    pub fn build_cache(&self) -> Result<Option<Arc<dyn PageCache>>> {
        match self.cache.kind {
            CacheKind::None => Ok(None),
            CacheKind::Memory => Ok(Some(Arc::new(MemoryCache::new()))),
            CacheKind::Disk => {
                let dir = self
                    .cache_dir()
                    .ok_or_else(|| RegisterError::Cache("no cache directory available".to_string()))?;
                Ok(Some(Arc::new(DiskCache::open(dir)?)))
            }
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("uk.gov", "openregister", "openregister")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.fetch.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.fetch.format, PageFormat::Tsv);
        assert_eq!(config.cache.kind, CacheKind::None);
        assert_eq!(config.locator().unwrap(), Locator::Production);
    }

    #[test]
    fn test_serialize_config() {
        let config = ClientConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[fetch]"));
        assert!(toml_str.contains("[cache]"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(
            &path,
            "[endpoint]\nphase = \"beta\"\n\n[fetch]\npage_size = 5000\nformat = \"json\"\n",
        )
        .unwrap();

        let config = ClientConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.fetch.page_size, 5000);
        assert_eq!(config.fetch.format, PageFormat::Json);
        assert_eq!(config.locator().unwrap(), Locator::phase("beta"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("openregister.toml");
        let mut config = ClientConfig::default();
        config.endpoint.base_url = Some("http://localhost:8080/register".to_string());
        config.fetch.page_size = 250;
        config.cache.kind = CacheKind::Memory;

        config.save(path.to_str().unwrap()).unwrap();
        let reloaded = ClientConfig::load_from(Some(path.to_str().unwrap())).unwrap();

        assert_eq!(reloaded.fetch.page_size, 250);
        assert_eq!(reloaded.cache.kind, CacheKind::Memory);
        assert_eq!(
            reloaded.locator().unwrap(),
            Locator::base_url("http://localhost:8080/register").unwrap()
        );
    }

    #[test]
    fn test_conflicting_endpoint() {
        let mut config = ClientConfig::default();
        config.endpoint.phase = Some("beta".to_string());
        config.endpoint.base_url = Some("http://register.example.org".to_string());
        assert!(config.locator().is_err());
    }

    #[test]
    fn test_build_disk_cache() {
        let dir = tempdir().unwrap();
        let mut config = ClientConfig::default();
        config.cache.kind = CacheKind::Disk;
        config.cache.dir = Some(dir.path().join("pages"));

        assert!(config.build_cache().unwrap().is_some());
        assert!(dir.path().join("pages").is_dir());
    }
}
