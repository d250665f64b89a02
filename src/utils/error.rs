//! Custom error types for pfx-export
//!
//! This module defines domain-specific error types using `thiserror` for
//! the failure modes of the export/convert pipeline. Every variant names the
//! path or stage it relates to so callers can render a specific message
//! without inspecting internals.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for pfx-export
#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("PFX export error: {0}")]
    Export(#[from] ExportError),

    #[error("PEM conversion error: {0}")]
    Decompose(#[from] DecomposeError),
}

/// Errors raised by `SecretHandle`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("Export password must not be empty")]
    Empty,

    #[error("Export password has already been released")]
    Released,
}

/// Certificate store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Access denied reading {path}: {message}")]
    AccessDenied { path: PathBuf, message: String },

    #[error("Certificate store unreadable at {locator}: {message}")]
    Read { locator: String, message: String },

    #[error("Failed to build PKCS#12 for {thumbprint}: {message}")]
    Pkcs12 { thumbprint: String, message: String },

    #[error("Export password unavailable: {0}")]
    Secret(#[from] SecretError),
}

/// Errors raised by the PFX export stage
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Export password must not be empty")]
    EmptySecret,

    #[error("Certificate {thumbprint} ({subject}) has no private key and cannot be exported")]
    NoPrivateKey { thumbprint: String, subject: String },

    #[error("Access denied for {path}: {message}")]
    AccessDenied { path: PathBuf, message: String },

    #[error("Certificate {locator} could not be read from the store: {message}")]
    StoreRead { locator: String, message: String },

    #[error("Output file already exists: {path}")]
    Conflict { path: PathBuf },

    #[error("Failed to create directory {path}: {message}")]
    DirectoryCreate { path: PathBuf, message: String },

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
}

impl ExportError {
    /// Remediation hint for errors the user can fix by changing how they run the tool
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            ExportError::AccessDenied { .. } => Some(
                "Machine-scoped certificates require elevated privileges; re-run as root (sudo) or choose the user store",
            ),
            ExportError::Conflict { .. } => {
                Some("Use --on-conflict overwrite or --on-conflict rename to proceed")
            }
            _ => None,
        }
    }
}

impl From<SecretError> for ExportError {
    fn from(_: SecretError) -> Self {
        ExportError::EmptySecret
    }
}

impl From<StoreError> for ExportError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccessDenied { path, message } => {
                ExportError::AccessDenied { path, message }
            }
            StoreError::Read { locator, message } => ExportError::StoreRead { locator, message },
            StoreError::Pkcs12 {
                thumbprint,
                message,
            } => ExportError::StoreRead {
                locator: thumbprint,
                message,
            },
            StoreError::Secret(_) => ExportError::EmptySecret,
        }
    }
}

/// Errors raised by the PEM decomposition stage
#[derive(Error, Debug)]
pub enum DecomposeError {
    #[error("OpenSSL executable not found: {searched}")]
    ToolchainNotFound { searched: String },

    #[error("OpenSSL {step} extraction failed (exit code {code:?}): {stderr}")]
    ToolchainExecution {
        step: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("OpenSSL {step} extraction timed out after {secs}s")]
    ToolchainTimeout { step: String, secs: u64 },

    #[error("No certificate could be extracted from {pfx}")]
    CertificateExtraction { pfx: PathBuf },

    #[error("No private key could be extracted from {pfx}")]
    KeyExtraction { pfx: PathBuf },

    #[error("PKCS#12 archive {path} is not readable: {message}")]
    PfxUnreadable { path: PathBuf, message: String },

    #[error("Failed to create directory {path}: {message}")]
    DirectoryCreate { path: PathBuf, message: String },

    #[error("Output file already exists: {path}")]
    Conflict { path: PathBuf },

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Export password unavailable: {0}")]
    Secret(#[from] SecretError),
}

impl DecomposeError {
    /// Remediation hint for errors the user can fix by changing how they run the tool
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            DecomposeError::ToolchainNotFound { .. } => Some(
                "Install OpenSSL or pass its location with --openssl (or toolchain.path in the config file)",
            ),
            DecomposeError::Conflict { .. } => {
                Some("Use --on-conflict overwrite or --on-conflict rename to proceed")
            }
            _ => None,
        }
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}
