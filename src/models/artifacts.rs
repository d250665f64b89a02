//! Pipeline artifacts: PKCS#12 archives and PEM output sets

use crate::cert_ops::secret::SecretHandle;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// What to do when an output file already exists.
///
/// Chosen once per run and applied to every output of that run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputConflictPolicy {
    /// Fail without writing anything
    #[default]
    Abort,
    /// Replace the existing files
    Overwrite,
    /// Write alongside the existing files under a timestamped name
    #[value(name = "rename")]
    #[serde(alias = "rename")]
    RenameWithTimestamp,
}

impl fmt::Display for OutputConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputConflictPolicy::Abort => write!(f, "abort"),
            OutputConflictPolicy::Overwrite => write!(f, "overwrite"),
            OutputConflictPolicy::RenameWithTimestamp => write!(f, "rename"),
        }
    }
}

/// The certification chain could not be completed.
///
/// Non-fatal: the archive still carries the leaf certificate and key.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("Chain incomplete for {subject}: no issuer found for {missing_issuer}")]
pub struct ChainBuildError {
    pub subject: String,
    pub missing_issuer: String,
}

/// Outcome of chain building during export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ChainStatus {
    /// Chain resolved up to a self-signed root (root itself not packaged)
    Complete { intermediates: usize },
    /// Chain could not be completed; the archive holds what was found
    Degraded(ChainBuildError),
}

impl ChainStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ChainStatus::Degraded(_))
    }
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainStatus::Complete { intermediates: 0 } => write!(f, "no intermediates"),
            ChainStatus::Complete { intermediates } => {
                write!(f, "{} intermediate certificate(s)", intermediates)
            }
            ChainStatus::Degraded(e) => write!(f, "degraded ({})", e),
        }
    }
}

/// A PKCS#12 archive on disk plus the password that opens it
#[derive(Debug)]
pub struct PfxArtifact {
    pub path: PathBuf,
    pub password: SecretHandle,
    pub chain: ChainStatus,
}

impl PfxArtifact {
    /// Wrap an existing archive (chain status unknown, assumed complete)
    pub fn existing(path: PathBuf, password: SecretHandle) -> Self {
        Self {
            path,
            password,
            chain: ChainStatus::Complete { intermediates: 0 },
        }
    }

    /// Archive file name without extension; names every PEM output
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "certificate".to_string())
    }
}

/// The four PEM files produced by a decomposition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PemArtifactSet {
    pub output_dir: PathBuf,
    pub cert: PathBuf,
    pub private_key: PathBuf,
    pub chain: PathBuf,
    pub full_chain: PathBuf,
}

impl PemArtifactSet {
    /// Derive the canonical file names for `base` inside `output_dir`
    pub fn for_base(output_dir: &Path, base: &str) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            cert: output_dir.join(format!("{}-cert.pem", base)),
            private_key: output_dir.join(format!("{}-privkey.pem", base)),
            chain: output_dir.join(format!("{}-chain.pem", base)),
            full_chain: output_dir.join(format!("{}-fullchain.pem", base)),
        }
    }

    /// All four paths: cert, private key, chain, full chain
    pub fn paths(&self) -> [&Path; 4] {
        [
            self.cert.as_path(),
            self.private_key.as_path(),
            self.chain.as_path(),
            self.full_chain.as_path(),
        ]
    }
}
