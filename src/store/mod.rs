//! Certificate store access
//!
//! The pipeline only talks to stores through [`CertificateStore`]: it needs
//! certificates to be enumerable and a selected certificate (with its key and
//! whatever chain can be resolved) to be packaged as PKCS#12 bytes.

pub mod chain;
pub mod directory;

pub use directory::DirectoryStore;

use crate::cert_ops::secret::SecretHandle;
use crate::models::{CertificateRef, ChainStatus, StoreScope};
use crate::utils::StoreError;

/// PKCS#12 bytes produced by a store, with the chain outcome
#[derive(Debug)]
pub struct StoreExport {
    pub pkcs12: Vec<u8>,
    pub chain: ChainStatus,
}

/// A source of exportable certificates
pub trait CertificateStore {
    /// Enumerate certificates in `scope`. Each call re-reads the store.
    fn list_certificates(&self, scope: StoreScope) -> Result<Vec<CertificateRef>, StoreError>;

    /// Package `cert`, its private key and its resolvable chain as PKCS#12
    /// encrypted under `password`.
    fn build_chain_and_export(
        &self,
        cert: &CertificateRef,
        password: &SecretHandle,
    ) -> Result<StoreExport, StoreError>;

    /// Find a certificate by thumbprint
    fn find_by_thumbprint(
        &self,
        scope: StoreScope,
        thumbprint: &str,
    ) -> Result<Option<CertificateRef>, StoreError> {
        Ok(self
            .list_certificates(scope)?
            .into_iter()
            .find(|c| c.matches_thumbprint(thumbprint)))
    }
}
