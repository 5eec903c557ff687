use config::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use crate::backend::HttpConfig;
use crate::backend::types::DEFAULT_BASE_URL;

const ENV_PREFIX: &str = "RAGCHAT";

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Failed to load config: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Config file already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Config directory not found")]
    NoConfigDir,
}

pub fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .map(|h| h.join("Library/Application Support/ragchat"))
    }

    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
            .map(|c| c.join("ragchat"))
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .map(|a| a.join("ragchat"))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .map(|h| h.join(".config/ragchat"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub connect_timeout_secs: u64,
    pub status_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_ms: 3000,
            connect_timeout_secs: 10,
            status_timeout_secs: 5,
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Loads defaults, then the config file, then `RAGCHAT_*` variables.
    /// Falls back to defaults with a warning if the sources are invalid.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from(Self::get_config_path().as_deref()).unwrap_or_else(|e| {
            eprintln!("Warning: {e}");
            Self::default()
        })
    }

    pub fn load_from(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_layers(path, None)
    }

    /// `env` replaces the process environment as the variable source when set.
    fn load_layers(path: Option<&Path>, env: Option<Map<String, String>>) -> ConfigResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        get_config_dir().map(|dir| dir.join("config.toml"))
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::new()
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .with_status_timeout(Duration::from_secs(self.status_timeout_secs))
    }

    #[must_use]
    pub fn log_file_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            get_config_dir().map_or_else(
                || PathBuf::from("ragchat.log"),
                |dir| dir.join("ragchat.log"),
            )
        })
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn init_default() -> ConfigResult<PathBuf> {
        let path = Self::get_config_path().ok_or(ConfigError::NoConfigDir)?;
        Self::init_at(&path)?;
        Ok(path)
    }

    pub fn init_at(path: &Path) -> ConfigResult<()> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, include_str!("config.template.toml"))?;
        Ok(())
    }
}
