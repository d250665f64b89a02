//! Certification chain building
//!
//! Walks issuer → subject links by raw distinguished-name bytes. The walk
//! stops at a self-signed certificate, which is treated as the root and left
//! out of the returned chain.

use crate::models::{ChainBuildError, ChainStatus};
use sha1::{Digest, Sha1};
use x509_parser::prelude::*;

/// Upper bound on chain length, guards against issuer loops
const MAX_CHAIN_DEPTH: usize = 10;

/// A parsed certificate usable as a chain link
#[derive(Debug, Clone)]
pub struct ChainCandidate {
    pub der: Vec<u8>,
    pub subject: String,
    pub issuer: String,
    subject_raw: Vec<u8>,
    issuer_raw: Vec<u8>,
}

impl ChainCandidate {
    /// Parse a DER certificate
    pub fn from_der(der: Vec<u8>) -> Result<Self, String> {
        let (subject, issuer, subject_raw, issuer_raw) = {
            let (_, cert) = X509Certificate::from_der(&der)
                .map_err(|e| format!("Failed to parse certificate: {:?}", e))?;
            (
                cert.subject().to_string(),
                cert.issuer().to_string(),
                cert.subject().as_raw().to_vec(),
                cert.issuer().as_raw().to_vec(),
            )
        };

        Ok(Self {
            der,
            subject,
            issuer,
            subject_raw,
            issuer_raw,
        })
    }

    pub fn is_self_issued(&self) -> bool {
        self.subject_raw == self.issuer_raw
    }

    fn issued(&self, other: &ChainCandidate) -> bool {
        self.subject_raw == other.issuer_raw && self.der != other.der
    }
}

/// Uppercase hex SHA-1 of a DER certificate
pub fn thumbprint(der: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(der);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect()
}

/// Resolve the intermediates above `leaf` from `pool`.
///
/// Returns the intermediates in leaf-to-root order.
pub fn build_chain(leaf: &ChainCandidate, pool: &[ChainCandidate]) -> (Vec<Vec<u8>>, ChainStatus) {
    let mut intermediates: Vec<Vec<u8>> = Vec::new();
    let mut current = leaf;

    loop {
        if current.is_self_issued() {
            let count = intermediates.len();
            return (intermediates, ChainStatus::Complete { intermediates: count });
        }

        if intermediates.len() >= MAX_CHAIN_DEPTH {
            tracing::warn!(subject = %leaf.subject, "Chain exceeds maximum depth");
            return (
                intermediates,
                ChainStatus::Degraded(ChainBuildError {
                    subject: leaf.subject.clone(),
                    missing_issuer: current.issuer.clone(),
                }),
            );
        }

        let issuer = pool
            .iter()
            .find(|c| c.issued(current) && !intermediates.contains(&c.der));

        match issuer {
            Some(issuer) if issuer.is_self_issued() => {
                let count = intermediates.len();
                return (intermediates, ChainStatus::Complete { intermediates: count });
            }
            Some(issuer) => {
                intermediates.push(issuer.der.clone());
                current = issuer;
            }
            None => {
                tracing::debug!(
                    subject = %leaf.subject,
                    missing = %current.issuer,
                    "Issuer not found in store"
                );
                return (
                    intermediates,
                    ChainStatus::Degraded(ChainBuildError {
                        subject: leaf.subject.clone(),
                        missing_issuer: current.issuer.clone(),
                    }),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, Issuer, KeyPair};

    fn ca_params(cn: &str) -> CertificateParams {
        let mut params = CertificateParams::new(Vec::default()).unwrap();
        params.distinguished_name.push(DnType::CommonName, cn);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params
    }

    struct Pki {
        root: ChainCandidate,
        intermediate: ChainCandidate,
        leaf: ChainCandidate,
        self_signed: ChainCandidate,
    }

    fn pki() -> Pki {
        let root_key = KeyPair::generate().unwrap();
        let root_params = ca_params("Test Root");
        let root_cert = root_params.self_signed(&root_key).unwrap();
        let root_issuer = Issuer::new(root_params, root_key);

        let int_key = KeyPair::generate().unwrap();
        let int_params = ca_params("Test Intermediate");
        let int_cert = int_params.signed_by(&int_key, &root_issuer).unwrap();
        let int_issuer = Issuer::new(int_params, int_key);

        let leaf_key = KeyPair::generate().unwrap();
        let leaf_params = CertificateParams::new(vec!["leaf.example.com".to_string()]).unwrap();
        let leaf_cert = leaf_params.signed_by(&leaf_key, &int_issuer).unwrap();

        let ss_key = KeyPair::generate().unwrap();
        let ss_cert = CertificateParams::new(vec!["self.example.com".to_string()])
            .unwrap()
            .self_signed(&ss_key)
            .unwrap();

        Pki {
            root: ChainCandidate::from_der(root_cert.der().to_vec()).unwrap(),
            intermediate: ChainCandidate::from_der(int_cert.der().to_vec()).unwrap(),
            leaf: ChainCandidate::from_der(leaf_cert.der().to_vec()).unwrap(),
            self_signed: ChainCandidate::from_der(ss_cert.der().to_vec()).unwrap(),
        }
    }

    #[test]
    fn test_self_signed_has_no_chain() {
        let pki = pki();
        let (chain, status) = build_chain(&pki.self_signed, &[pki.root.clone()]);
        assert!(chain.is_empty());
        assert_eq!(status, ChainStatus::Complete { intermediates: 0 });
    }

    #[test]
    fn test_full_chain_excludes_root() {
        let pki = pki();
        let pool = vec![pki.root.clone(), pki.intermediate.clone()];
        let (chain, status) = build_chain(&pki.leaf, &pool);
        assert_eq!(chain, vec![pki.intermediate.der.clone()]);
        assert_eq!(status, ChainStatus::Complete { intermediates: 1 });
    }

    #[test]
    fn test_missing_root_is_degraded() {
        let pki = pki();
        let (chain, status) = build_chain(&pki.leaf, &[pki.intermediate.clone()]);
        assert_eq!(chain.len(), 1);
        match status {
            ChainStatus::Degraded(e) => assert!(e.missing_issuer.contains("Test Root")),
            other => panic!("expected degraded chain, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_intermediate_is_degraded() {
        let pki = pki();
        let (chain, status) = build_chain(&pki.leaf, &[pki.root.clone()]);
        assert!(chain.is_empty());
        assert!(status.is_degraded());
    }

    #[test]
    fn test_thumbprint_format() {
        let pki = pki();
        let tp = thumbprint(&pki.leaf.der);
        assert_eq!(tp.len(), 40);
        assert!(tp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
