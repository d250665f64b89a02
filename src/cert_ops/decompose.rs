//! PKCS#12 → PEM decomposition
//!
//! Splits an archive into the four files Linux TLS servers expect:
//!
//! | File                  | Contents                                   |
//! |-----------------------|--------------------------------------------|
//! | `<base>-cert.pem`     | leaf certificate                           |
//! | `<base>-privkey.pem`  | private key, **unencrypted**               |
//! | `<base>-chain.pem`    | intermediates (zero bytes if there are none) |
//! | `<base>-fullchain.pem`| `cert.pem` followed by `chain.pem`         |
//!
//! # Security
//!
//! The private key is written without a passphrase so that services can load
//! it unattended. It is created owner-only (0600) on Unix; protect the output
//! directory accordingly.

use crate::cert_ops::layout::{self, StagedFile};
use crate::cert_ops::toolchain::{ExtractStep, Toolchain};
use crate::models::{OutputConflictPolicy, PemArtifactSet, PfxArtifact};
use crate::utils::DecomposeError;
use std::path::Path;
use zeroize::Zeroizing;

const CERT_MARKER: &str = "-----BEGIN CERTIFICATE-----";

/// Drives the toolchain over an archive and publishes the PEM set
#[derive(Debug, Clone)]
pub struct PemDecomposer {
    toolchain: Toolchain,
    strip_bag_attributes: bool,
}

impl PemDecomposer {
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            toolchain,
            strip_bag_attributes: false,
        }
    }

    /// Re-encode outputs as bare PEM blocks, dropping "Bag Attributes" text
    pub fn strip_bag_attributes(mut self, strip: bool) -> Self {
        self.strip_bag_attributes = strip;
        self
    }

    /// Decompose `pfx` into `output_dir`.
    ///
    /// Nothing is published unless all three extractions succeed, and the
    /// four files are published together or not at all.
    pub async fn decompose(
        &self,
        pfx: &PfxArtifact,
        output_dir: &Path,
        policy: OutputConflictPolicy,
    ) -> Result<PemArtifactSet, DecomposeError> {
        std::fs::File::open(&pfx.path).map_err(|e| DecomposeError::PfxUnreadable {
            path: pfx.path.clone(),
            message: e.to_string(),
        })?;

        std::fs::create_dir_all(output_dir).map_err(|e| DecomposeError::DirectoryCreate {
            path: output_dir.to_path_buf(),
            message: e.to_string(),
        })?;

        let base = pfx.base_name();
        let mut set = layout::resolve_pem_set(output_dir, &base, policy)?;
        tracing::info!(
            "Decomposing {} into {} with {}",
            pfx.path.display(),
            output_dir.display(),
            self.toolchain.path().display()
        );

        let cert_file = self.stage(&set.cert)?;
        let cert = self
            .extract(ExtractStep::Certificate, pfx, &cert_file)
            .await?;
        cert_file.set_public().map_err(|e| write_error(&set.cert, e))?;

        let key_file = self.stage(&set.private_key)?;
        let _key = self
            .extract(ExtractStep::PrivateKey, pfx, &key_file)
            .await?;

        let chain_file = self.stage(&set.chain)?;
        let chain = self.extract(ExtractStep::Chain, pfx, &chain_file).await?;
        chain_file.set_public().map_err(|e| write_error(&set.chain, e))?;

        let full_chain_file = self.stage(&set.full_chain)?;
        let mut full_chain = Vec::with_capacity(cert.len() + chain.len());
        full_chain.extend_from_slice(&cert);
        full_chain.extend_from_slice(&chain);
        full_chain_file
            .write_all(&full_chain)
            .map_err(|e| write_error(&set.full_chain, e))?;
        full_chain_file
            .set_public()
            .map_err(|e| write_error(&set.full_chain, e))?;

        let mut staged = [cert_file, key_file, chain_file, full_chain_file];
        loop {
            match layout::publish_set(&mut staged, policy) {
                Ok(()) => break,
                Err(failure) if failure.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    if policy != OutputConflictPolicy::RenameWithTimestamp {
                        return Err(DecomposeError::Conflict {
                            path: failure.target,
                        });
                    }
                    // Another writer took a name between resolve and publish.
                    let next = layout::resolve_pem_set(output_dir, &base, policy)?;
                    tracing::debug!(
                        "{} was taken, retrying as {}",
                        failure.target.display(),
                        next.cert.display()
                    );
                    for (file, target) in staged.iter_mut().zip(next.paths()) {
                        file.retarget(target.to_path_buf());
                    }
                    set = next;
                }
                Err(failure) => return Err(write_error(&failure.target, failure.error)),
            }
        }
        for file in &staged {
            tracing::debug!("Wrote {}", file.target().display());
        }

        Ok(set)
    }

    fn stage(&self, target: &Path) -> Result<StagedFile, DecomposeError> {
        StagedFile::create(target).map_err(|e| write_error(target, e))
    }

    /// Run one extraction into `staged` and apply the per-step rules.
    ///
    /// Returns the final bytes of the staged file.
    async fn extract(
        &self,
        step: ExtractStep,
        pfx: &PfxArtifact,
        staged: &StagedFile,
    ) -> Result<Zeroizing<Vec<u8>>, DecomposeError> {
        let outcome = self
            .toolchain
            .extract(step, &pfx.path, staged.path(), &pfx.password)
            .await?;

        let content = Zeroizing::new(staged.read().map_err(|e| DecomposeError::Read {
            path: staged.path().to_path_buf(),
            message: e.to_string(),
        })?);

        let failed = || DecomposeError::ToolchainExecution {
            step: step.to_string(),
            code: outcome.code,
            stderr: outcome.stderr.clone(),
        };

        let content = match step {
            ExtractStep::Certificate => {
                if !outcome.success {
                    return Err(failed());
                }
                if !contains_certificate(&content) {
                    return Err(DecomposeError::CertificateExtraction {
                        pfx: pfx.path.clone(),
                    });
                }
                content
            }
            ExtractStep::PrivateKey => {
                if !outcome.success {
                    return Err(failed());
                }
                if !contains_private_key(&content) {
                    return Err(DecomposeError::KeyExtraction {
                        pfx: pfx.path.clone(),
                    });
                }
                content
            }
            ExtractStep::Chain => {
                if !contains_certificate(&content) {
                    if !outcome.success {
                        tracing::warn!(
                            "Chain extraction exited with {:?} and produced no certificates; treating as no intermediates",
                            outcome.code
                        );
                    }
                    Zeroizing::new(Vec::new())
                } else if !outcome.success {
                    return Err(failed());
                } else {
                    content
                }
            }
        };

        let content = if self.strip_bag_attributes && !content.is_empty() {
            strip_bag_attributes(&content)
        } else {
            content
        };

        staged
            .write_all(&content)
            .map_err(|e| write_error(staged.target(), e))?;
        Ok(content)
    }
}

/// Decompose with a toolchain at `toolchain_path`
pub async fn decompose(
    toolchain_path: &Path,
    settings: &crate::config::Settings,
    pfx: &PfxArtifact,
    output_dir: &Path,
    policy: OutputConflictPolicy,
) -> Result<PemArtifactSet, DecomposeError> {
    let toolchain = Toolchain::new(toolchain_path.to_path_buf(), &settings.toolchain)?;
    PemDecomposer::new(toolchain)
        .strip_bag_attributes(settings.output.strip_bag_attributes)
        .decompose(pfx, output_dir, policy)
        .await
}

fn write_error(path: &Path, e: std::io::Error) -> DecomposeError {
    DecomposeError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn contains_certificate(content: &[u8]) -> bool {
    String::from_utf8_lossy(content).contains(CERT_MARKER)
}

fn contains_private_key(content: &[u8]) -> bool {
    let text = String::from_utf8_lossy(content);
    text.lines()
        .any(|line| line.starts_with("-----BEGIN ") && line.ends_with("PRIVATE KEY-----"))
}

/// Keep only the PEM blocks, LF line endings, no surrounding text
fn strip_bag_attributes(content: &[u8]) -> Zeroizing<Vec<u8>> {
    match ::pem::parse_many(content) {
        Ok(blocks) if !blocks.is_empty() => {
            let config = ::pem::EncodeConfig::new().set_line_ending(::pem::LineEnding::LF);
            let mut out = Zeroizing::new(Vec::with_capacity(content.len()));
            for block in &blocks {
                out.extend_from_slice(::pem::encode_config(block, config).as_bytes());
            }
            out
        }
        Ok(_) => Zeroizing::new(content.to_vec()),
        Err(e) => {
            tracing::warn!("Could not re-encode PEM output, keeping it as-is: {}", e);
            Zeroizing::new(content.to_vec())
        }
    }
}
