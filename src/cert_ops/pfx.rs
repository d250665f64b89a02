//! Store certificate → PKCS#12 archive

use crate::cert_ops::layout::{self, StagedFile};
use crate::cert_ops::secret::SecretHandle;
use crate::models::{CertificateRef, OutputConflictPolicy, PfxArtifact};
use crate::store::CertificateStore;
use crate::utils::ExportError;
use std::io::ErrorKind;
use std::path::Path;

/// Exports store certificates as password-protected PKCS#12 files
pub struct PfxExporter<'a> {
    store: &'a dyn CertificateStore,
}

impl<'a> PfxExporter<'a> {
    pub fn new(store: &'a dyn CertificateStore) -> Self {
        Self { store }
    }

    /// Write `cert`, its key and its resolvable chain to `dest`.
    ///
    /// The private-key precondition is checked before anything touches the
    /// filesystem. An incomplete chain does not fail the export; it is
    /// recorded on the returned artifact.
    pub fn export_to_pfx(
        &self,
        cert: &CertificateRef,
        dest: &Path,
        password: SecretHandle,
        policy: OutputConflictPolicy,
    ) -> Result<PfxArtifact, ExportError> {
        if !cert.has_private_key {
            return Err(ExportError::NoPrivateKey {
                thumbprint: cert.thumbprint.clone(),
                subject: cert.subject.clone(),
            });
        }
        if password.is_released() {
            return Err(ExportError::EmptySecret);
        }

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                if e.kind() == ErrorKind::PermissionDenied {
                    ExportError::AccessDenied {
                        path: parent.to_path_buf(),
                        message: e.to_string(),
                    }
                } else {
                    ExportError::DirectoryCreate {
                        path: parent.to_path_buf(),
                        message: e.to_string(),
                    }
                }
            })?;
        }

        let target = layout::resolve_pfx_destination(dest, policy)?;

        tracing::info!(
            "Exporting {} ({}) to {}",
            cert.display_name(),
            cert.thumbprint,
            target.display()
        );
        let export = self.store.build_chain_and_export(cert, &password)?;

        let mut staged = StagedFile::create(&target).map_err(|e| write_error(&target, e))?;
        staged
            .write_all(&export.pkcs12)
            .map_err(|e| write_error(&target, e))?;

        loop {
            match staged.publish(policy) {
                Ok(()) => break,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => match policy {
                    OutputConflictPolicy::RenameWithTimestamp => {
                        // Another writer took the name between resolve and publish.
                        let next = layout::resolve_pfx_destination(dest, policy)?;
                        tracing::debug!(
                            "{} was taken, retrying as {}",
                            staged.target().display(),
                            next.display()
                        );
                        staged.retarget(next);
                    }
                    _ => {
                        return Err(ExportError::Conflict {
                            path: staged.target().to_path_buf(),
                        })
                    }
                },
                Err(e) => return Err(write_error(staged.target(), e)),
            }
        }

        Ok(PfxArtifact {
            path: staged.target().to_path_buf(),
            password,
            chain: export.chain,
        })
    }
}

fn write_error(path: &Path, e: std::io::Error) -> ExportError {
    if e.kind() == ErrorKind::PermissionDenied {
        ExportError::AccessDenied {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    } else {
        ExportError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }
}
