//! Application settings configuration
//!
//! Defines toolchain discovery, store locations, output behaviour and run
//! history. Every section is optional in the TOML file.

use crate::models::{OutputConflictPolicy, StoreScope};
use crate::utils::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How the export password reaches the OpenSSL child process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretDelivery {
    /// `-passin stdin`, password written to the child's stdin pipe
    #[default]
    Stdin,
    /// `-passin pass:<password>`, visible in process listings
    Argument,
}

/// External toolchain settings
#[derive(Debug, Clone, Deserialize)]
pub struct ToolchainSettings {
    /// Explicit OpenSSL path; skips discovery when set
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Locations tried after the PATH lookup
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<PathBuf>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub secret_delivery: SecretDelivery,
    /// Pass `-legacy` (OpenSSL 3 reading RC2/3DES archives)
    #[serde(default)]
    pub legacy_provider: bool,
}

fn default_timeout() -> u64 {
    30
}

fn default_search_paths() -> Vec<PathBuf> {
    [
        "/usr/bin/openssl",
        "/usr/local/bin/openssl",
        "/usr/local/ssl/bin/openssl",
        "/opt/homebrew/bin/openssl",
        "/opt/homebrew/opt/openssl@3/bin/openssl",
        "/usr/local/opt/openssl@3/bin/openssl",
        "C:\\Program Files\\OpenSSL-Win64\\bin\\openssl.exe",
        "C:\\Program Files\\OpenSSL\\bin\\openssl.exe",
        "C:\\Program Files (x86)\\OpenSSL-Win32\\bin\\openssl.exe",
        "C:\\Program Files\\Git\\usr\\bin\\openssl.exe",
        "C:\\Program Files\\Git\\mingw64\\bin\\openssl.exe",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            path: None,
            search_paths: default_search_paths(),
            timeout_secs: default_timeout(),
            secret_delivery: SecretDelivery::default(),
            legacy_provider: false,
        }
    }
}

impl ToolchainSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Certificate store locations
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_user_root")]
    pub user_root: PathBuf,
    #[serde(default = "default_machine_root")]
    pub machine_root: PathBuf,
}

fn default_user_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pfx-export")
        .join("store")
}

fn default_machine_root() -> PathBuf {
    PathBuf::from("/etc/pfx-export/store")
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            user_root: default_user_root(),
            machine_root: default_machine_root(),
        }
    }
}

impl StoreSettings {
    /// Directory holding the personal store for `scope`
    pub fn root_for(&self, scope: StoreScope) -> &Path {
        match scope {
            StoreScope::UserPersonal => &self.user_root,
            StoreScope::MachinePersonal => &self.machine_root,
        }
    }
}

/// Output behaviour
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub conflict_policy: OutputConflictPolicy,
    /// Re-encode PEM outputs without the toolchain's "Bag Attributes" preamble
    #[serde(default)]
    pub strip_bag_attributes: bool,
}

/// Run history archive
#[derive(Debug, Clone, Deserialize)]
pub struct HistorySettings {
    #[serde(default = "default_history_enabled")]
    pub enabled: bool,
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

fn default_history_enabled() -> bool {
    true
}

fn default_history_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pfx-export")
        .join("history.jsonl")
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            enabled: default_history_enabled(),
            path: default_history_path(),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub toolchain: ToolchainSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub history: HistorySettings,
}

impl Settings {
    /// Load settings from the default config file, or defaults if absent
    pub fn load_default() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        Self::from_toml(&content)
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.toolchain.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "toolchain.timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// `<config dir>/pfx-export/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pfx-export").join("config.toml"))
}
