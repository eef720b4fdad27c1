//! Application configuration.
//!
//! Two sources:
//! - `ApiConfig`: base URL, service name and signature key for each of the
//!   field, user and order services, read from the environment
//!   (`FIELD_API_URL`, `FIELD_SERVICE_NAME`, `FIELD_SIGNATURE_KEY`, and the
//!   `USER_*` / `ORDER_*` equivalents)
//! - `Config`: user preferences stored at `~/.config/fieldbook/config.json`

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application name used for config/data directory paths
const APP_NAME: &str = "fieldbook";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(String),
}

/// Which backend service a request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Field,
    User,
    Order,
}

impl Service {
    fn env_prefix(&self) -> &'static str {
        match self {
            Service::Field => "FIELD",
            Service::User => "USER",
            Service::Order => "ORDER",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Field => f.write_str("field"),
            Service::User => f.write_str("user"),
            Service::Order => f.write_str("order"),
        }
    }
}

/// Where and as whom to call one backend service.
#[derive(Clone)]
pub struct ServiceTarget {
    pub base_url: String,
    pub service_name: String,
    pub signature_key: String,
}

impl fmt::Debug for ServiceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTarget")
            .field("base_url", &self.base_url)
            .field("service_name", &self.service_name)
            .field("signature_key", &"<redacted>")
            .finish()
    }
}

impl ServiceTarget {
    /// Build a target, rejecting empty values. Trailing slashes are dropped
    /// from the base URL so paths can be appended directly.
    pub fn new(
        base_url: impl Into<String>,
        service_name: impl Into<String>,
        signature_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        let service_name = service_name.into().trim().to_string();
        let signature_key = signature_key.into();
        if base_url.is_empty() {
            return Err(ConfigError::Missing("base URL".to_string()));
        }
        if service_name.is_empty() {
            return Err(ConfigError::Missing("service name".to_string()));
        }
        if signature_key.is_empty() {
            return Err(ConfigError::Missing("signature key".to_string()));
        }
        Ok(Self {
            base_url,
            service_name,
            signature_key,
        })
    }

    /// Read `<PREFIX>_API_URL`, `<PREFIX>_SERVICE_NAME`, `<PREFIX>_SIGNATURE_KEY`
    /// through `lookup`.
    fn from_lookup<F>(service: Service, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = service.env_prefix();
        let var = |suffix: &str| -> Result<String, ConfigError> {
            let name = format!("{}_{}", prefix, suffix);
            lookup(&name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        Self::new(var("API_URL")?, var("SERVICE_NAME")?, var("SIGNATURE_KEY")?)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// The three service targets.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub field: ServiceTarget,
    pub user: ServiceTarget,
    pub order: ServiceTarget,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            field: ServiceTarget::from_lookup(Service::Field, &lookup)?,
            user: ServiceTarget::from_lookup(Service::User, &lookup)?,
            order: ServiceTarget::from_lookup(Service::Order, &lookup)?,
        })
    }

    pub fn target(&self, service: Service) -> &ServiceTarget {
        match service {
            Service::Field => &self.field,
            Service::User => &self.user,
            Service::Order => &self.order,
        }
    }
}

/// Where the persisted session lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub last_username: Option<String>,
    #[serde(default)]
    pub storage: StorageBackend,
    pub data_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the persisted session and log files.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}
