//! Utility modules for pfx-export
//!
//! This module contains error types, progress indicators, and other utilities.

pub mod error;
pub mod progress;

pub use error::{
    ConfigError, DecomposeError, ExportError, SecretError, StoreError, ToolkitError,
};
