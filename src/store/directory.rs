//! Directory-backed certificate store
//!
//! Layout, one directory per scope:
//!
//! ```text
//! <scope root>/
//!   web.pem        leaf CERTIFICATE, optional extra CERTIFICATEs, optional PRIVATE KEY
//!   api.crt
//!   ca/
//!     intermediate.pem   shared intermediates used for chain building
//! ```
//!
//! The machine scope lives under `/etc` by default, so reading it as an
//! unprivileged user surfaces as [`StoreError::AccessDenied`].

use super::chain::{self, ChainCandidate};
use super::{CertificateStore, StoreExport};
use crate::cert_ops::secret::SecretHandle;
use crate::config::StoreSettings;
use crate::models::{CertificateRef, ChainStatus, StoreScope};
use crate::utils::StoreError;
use chrono::{DateTime, TimeZone, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use x509_parser::prelude::*;
use zeroize::Zeroizing;

const BUNDLE_EXTENSIONS: [&str; 2] = ["pem", "crt"];
const CA_DIR: &str = "ca";

/// PEM tags recognised as private keys
const KEY_TAGS: [&str; 4] = [
    "PRIVATE KEY",
    "RSA PRIVATE KEY",
    "EC PRIVATE KEY",
    "ENCRYPTED PRIVATE KEY",
];

/// Contents of one bundle file
struct Bundle {
    certs: Vec<Vec<u8>>,
    key: Option<::pem::Pem>,
}

/// Certificate store backed by PEM bundles on disk
pub struct DirectoryStore {
    settings: StoreSettings,
}

impl DirectoryStore {
    pub fn new(settings: StoreSettings) -> Self {
        Self { settings }
    }

    /// Root directory of `scope`
    pub fn scope_root(&self, scope: StoreScope) -> &Path {
        self.settings.root_for(scope)
    }

    fn read_bundle(path: &Path) -> Result<Bundle, StoreError> {
        let data = std::fs::read(path).map_err(|e| io_error(path, e))?;

        let pems = ::pem::parse_many(&data).map_err(|e| StoreError::Read {
            locator: path.display().to_string(),
            message: format!("Failed to parse PEM: {}", e),
        })?;

        let mut certs = Vec::new();
        let mut key = None;
        for block in pems {
            if block.tag() == "CERTIFICATE" {
                certs.push(block.into_contents());
            } else if key.is_none() && KEY_TAGS.contains(&block.tag()) {
                key = Some(block);
            }
        }

        if certs.is_empty() {
            return Err(StoreError::Read {
                locator: path.display().to_string(),
                message: "No CERTIFICATE blocks found".to_string(),
            });
        }

        Ok(Bundle { certs, key })
    }

    fn describe(
        scope: StoreScope,
        path: &Path,
        bundle: &Bundle,
    ) -> Result<CertificateRef, StoreError> {
        let leaf = &bundle.certs[0];
        let (_, cert) = X509Certificate::from_der(leaf).map_err(|e| StoreError::Read {
            locator: path.display().to_string(),
            message: format!("Failed to parse certificate: {:?}", e),
        })?;

        let not_after = asn1_time_to_datetime(cert.validity().not_after).ok_or_else(|| {
            StoreError::Read {
                locator: path.display().to_string(),
                message: "Invalid timestamp in certificate".to_string(),
            }
        })?;

        Ok(CertificateRef {
            scope,
            locator: path.display().to_string(),
            subject: cert.subject().to_string(),
            friendly_name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            thumbprint: chain::thumbprint(leaf),
            not_after,
            has_private_key: bundle.key.is_some(),
        })
    }

    /// Shared intermediates from `<scope root>/ca`
    fn ca_pool(&self, scope: StoreScope) -> Vec<ChainCandidate> {
        let dir = self.scope_root(scope).join(CA_DIR);
        let mut pool = Vec::new();
        for path in bundle_files(&dir).unwrap_or_default() {
            match Self::read_bundle(&path) {
                Ok(bundle) => pool.extend(
                    bundle
                        .certs
                        .into_iter()
                        .filter_map(|der| ChainCandidate::from_der(der).ok()),
                ),
                Err(e) => tracing::warn!("Skipping CA file {}: {}", path.display(), e),
            }
        }
        pool
    }
}

impl CertificateStore for DirectoryStore {
    fn list_certificates(&self, scope: StoreScope) -> Result<Vec<CertificateRef>, StoreError> {
        let root = self.scope_root(scope);
        if !root.exists() {
            tracing::debug!("Store {} has no directory at {}", scope, root.display());
            return Ok(Vec::new());
        }

        let mut certs = Vec::new();
        for path in bundle_files(root)? {
            let described = Self::read_bundle(&path).and_then(|b| Self::describe(scope, &path, &b));
            match described {
                Ok(cert) => certs.push(cert),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        certs.sort_by(|a, b| a.friendly_name.cmp(&b.friendly_name));
        tracing::debug!("Found {} certificate(s) in {}", certs.len(), scope);
        Ok(certs)
    }

    fn build_chain_and_export(
        &self,
        cert: &CertificateRef,
        password: &SecretHandle,
    ) -> Result<StoreExport, StoreError> {
        let path = PathBuf::from(&cert.locator);
        let bundle = Self::read_bundle(&path)?;

        // The bundle may have been replaced since enumeration.
        let current = chain::thumbprint(&bundle.certs[0]);
        if !cert.matches_thumbprint(&current) {
            return Err(StoreError::Read {
                locator: cert.locator.clone(),
                message: format!(
                    "Certificate changed since it was selected (expected {}, found {})",
                    cert.thumbprint, current
                ),
            });
        }

        let key = bundle.key.ok_or_else(|| StoreError::Read {
            locator: cert.locator.clone(),
            message: "Private key is no longer present".to_string(),
        })?;
        if key.tag() != "PRIVATE KEY" {
            return Err(StoreError::Read {
                locator: cert.locator.clone(),
                message: format!(
                    "Unsupported key encoding '{}' (PKCS#8 'PRIVATE KEY' required)",
                    key.tag()
                ),
            });
        }
        let key_der = Zeroizing::new(key.into_contents());

        let mut certs = bundle.certs.into_iter();
        let leaf_der = certs.next().unwrap_or_default();
        let leaf = ChainCandidate::from_der(leaf_der.clone()).map_err(|message| {
            StoreError::Read {
                locator: cert.locator.clone(),
                message,
            }
        })?;

        let mut pool: Vec<ChainCandidate> = certs
            .filter_map(|der| ChainCandidate::from_der(der).ok())
            .collect();
        pool.extend(self.ca_pool(cert.scope));

        let (intermediates, chain_status) = chain::build_chain(&leaf, &pool);
        if let ChainStatus::Degraded(e) = &chain_status {
            tracing::warn!("{}", e);
        }

        let p12_certs: Result<Vec<p12_keystore::Certificate>, _> = std::iter::once(&leaf_der)
            .chain(intermediates.iter())
            .map(|der| p12_keystore::Certificate::from_der(der))
            .collect();
        let p12_certs = p12_certs.map_err(|e| StoreError::Pkcs12 {
            thumbprint: cert.thumbprint.clone(),
            message: format!("Failed to parse certificate for PKCS#12: {}", e),
        })?;

        let local_key_id = chain::thumbprint(&leaf_der).into_bytes();
        let key_chain =
            p12_keystore::PrivateKeyChain::new(key_der.as_slice(), &local_key_id, p12_certs);

        let mut keystore = p12_keystore::KeyStore::new();
        keystore.add_entry(
            &cert.display_name(),
            p12_keystore::KeyStoreEntry::PrivateKeyChain(key_chain),
        );

        let pkcs12 = password
            .with_exposed(|pwd| keystore.writer(pwd).write())?
            .map_err(|e| StoreError::Pkcs12 {
                thumbprint: cert.thumbprint.clone(),
                message: format!("Failed to serialize PKCS#12: {}", e),
            })?;

        Ok(StoreExport {
            pkcs12,
            chain: chain_status,
        })
    }
}

/// Bundle files directly inside `dir`, sorted by name
fn bundle_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_error(dir, e))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| BUNDLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    if e.kind() == ErrorKind::PermissionDenied {
        StoreError::AccessDenied {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    } else {
        StoreError::Read {
            locator: path.display().to_string(),
            message: e.to_string(),
        }
    }
}

/// Convert ASN.1 time to chrono DateTime
fn asn1_time_to_datetime(time: ASN1Time) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(time.timestamp(), 0).single()
}
