//! Configuration module for pfx-export
//!
//! Handles loading settings from TOML files.

pub mod settings;

pub use settings::{
    HistorySettings, OutputSettings, SecretDelivery, Settings, StoreSettings, ToolchainSettings,
};

use crate::utils::ConfigError;
use std::path::Path;

/// Load settings from `path` when given, otherwise from the default location
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    match path {
        Some(p) => Settings::load_from_file(p),
        None => Settings::load_default(),
    }
}
