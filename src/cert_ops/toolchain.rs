//! OpenSSL discovery and invocation
//!
//! Each extraction is one `openssl pkcs12` run against the archive:
//!
//! ```text
//! openssl pkcs12 [-legacy] -in <pfx> <filter flags> -out <file> -passin <source>
//! ```
//!
//! The password source is `stdin` by default, so the secret never appears in
//! the process list. `pass:<password>` is available for toolchains that cannot
//! read it from a pipe.

use crate::cert_ops::secret::SecretHandle;
use crate::config::{SecretDelivery, ToolchainSettings};
use crate::utils::DecomposeError;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use zeroize::Zeroizing;

/// One extraction against a PKCS#12 archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStep {
    /// Leaf certificate only
    Certificate,
    /// Private key only, unencrypted
    PrivateKey,
    /// CA / intermediate certificates only
    Chain,
}

impl ExtractStep {
    /// `openssl pkcs12` filter flags for this step
    pub fn filter_flags(&self) -> &'static [&'static str] {
        match self {
            ExtractStep::Certificate => &["-clcerts", "-nokeys"],
            ExtractStep::PrivateKey => &["-nocerts", "-nodes"],
            ExtractStep::Chain => &["-cacerts", "-nokeys"],
        }
    }
}

impl fmt::Display for ExtractStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractStep::Certificate => write!(f, "certificate"),
            ExtractStep::PrivateKey => write!(f, "private key"),
            ExtractStep::Chain => write!(f, "chain"),
        }
    }
}

/// Exit status and diagnostics of one toolchain run
#[derive(Debug, Clone)]
pub struct ExtractOutcome {
    pub code: Option<i32>,
    pub success: bool,
    pub stderr: String,
}

/// A resolved OpenSSL executable and how to drive it
#[derive(Debug, Clone)]
pub struct Toolchain {
    path: PathBuf,
    timeout: Duration,
    delivery: SecretDelivery,
    legacy: bool,
}

impl Toolchain {
    /// Use the executable at `path`
    pub fn new(path: PathBuf, settings: &ToolchainSettings) -> Result<Self, DecomposeError> {
        if !is_executable(&path) {
            return Err(DecomposeError::ToolchainNotFound {
                searched: path.display().to_string(),
            });
        }

        Ok(Self {
            path,
            timeout: settings.timeout(),
            delivery: settings.secret_delivery,
            legacy: settings.legacy_provider,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn args(&self, step: ExtractStep, pfx: &Path, out: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = vec!["pkcs12".into()];
        if self.legacy {
            args.push("-legacy".into());
        }
        args.push("-in".into());
        args.push(pfx.as_os_str().to_owned());
        args.extend(step.filter_flags().iter().map(|f| (*f).into()));
        args.push("-out".into());
        args.push(out.as_os_str().to_owned());
        args
    }

    /// Run one extraction, writing the result to `out`.
    ///
    /// A non-zero exit is returned as an outcome, not an error; the caller
    /// decides whether it is fatal for `step`.
    pub async fn extract(
        &self,
        step: ExtractStep,
        pfx: &Path,
        out: &Path,
        secret: &SecretHandle,
    ) -> Result<ExtractOutcome, DecomposeError> {
        let mut cmd = Command::new(&self.path);
        cmd.args(self.args(step, pfx, out))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Only one of these is populated, depending on delivery mode.
        let mut stdin_payload: Option<Zeroizing<Vec<u8>>> = None;
        match self.delivery {
            SecretDelivery::Stdin => {
                cmd.arg("-passin").arg("stdin").stdin(Stdio::piped());
                stdin_payload = Some(secret.with_exposed(|pwd| {
                    let mut line = Zeroizing::new(Vec::with_capacity(pwd.len() + 1));
                    line.extend_from_slice(pwd.as_bytes());
                    line.push(b'\n');
                    line
                })?);
            }
            SecretDelivery::Argument => {
                let arg = secret.with_exposed(|pwd| Zeroizing::new(format!("pass:{}", pwd)))?;
                cmd.arg("-passin").arg(arg.as_str()).stdin(Stdio::null());
            }
        }

        tracing::debug!(
            "Running {} pkcs12 ({} extraction) on {}",
            self.path.display(),
            step,
            pfx.display()
        );

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => DecomposeError::ToolchainNotFound {
                searched: format!("{} ({})", self.path.display(), e),
            },
            _ => DecomposeError::ToolchainExecution {
                step: step.to_string(),
                code: None,
                stderr: format!("Failed to start {}: {}", self.path.display(), e),
            },
        })?;

        let run = async {
            if let (Some(payload), Some(mut stdin)) = (stdin_payload.as_ref(), child.stdin.take()) {
                // The child may exit before reading the password (bad archive).
                if let Err(e) = stdin.write_all(payload).await {
                    if e.kind() != ErrorKind::BrokenPipe {
                        tracing::debug!("Writing password to toolchain stdin failed: {}", e);
                    }
                }
                drop(stdin);
            }
            child.wait_with_output().await
        };

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(DecomposeError::ToolchainExecution {
                    step: step.to_string(),
                    code: None,
                    stderr: e.to_string(),
                })
            }
            Err(_) => {
                tracing::warn!("{} extraction timed out after {:?}", step, self.timeout);
                return Err(DecomposeError::ToolchainTimeout {
                    step: step.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        let outcome = ExtractOutcome {
            code: output.status.code(),
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };
        tracing::debug!("{} extraction exited with {:?}", step, outcome.code);
        Ok(outcome)
    }
}

/// Resolve the OpenSSL executable: configured path, then PATH, then known
/// install locations.
pub fn discover(settings: &ToolchainSettings) -> Result<PathBuf, DecomposeError> {
    if let Some(path) = &settings.path {
        return if is_executable(path) {
            Ok(path.clone())
        } else {
            Err(DecomposeError::ToolchainNotFound {
                searched: path.display().to_string(),
            })
        };
    }

    if let Some(path) = search_path(binary_name()) {
        tracing::debug!("Found OpenSSL on PATH at {}", path.display());
        return Ok(path);
    }

    if let Some(path) = settings.search_paths.iter().find(|p| is_executable(p)) {
        tracing::debug!("Found OpenSSL at {}", path.display());
        return Ok(path.clone());
    }

    let mut searched = vec!["PATH".to_string()];
    searched.extend(settings.search_paths.iter().map(|p| p.display().to_string()));
    Err(DecomposeError::ToolchainNotFound {
        searched: searched.join(", "),
    })
}

fn binary_name() -> &'static str {
    if cfg!(windows) {
        "openssl.exe"
    } else {
        "openssl"
    }
}

fn search_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

/// Regular file with an execute bit (any file on non-Unix)
pub fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
