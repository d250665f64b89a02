//! Store-resident certificate types

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which personal certificate store a certificate lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StoreScope {
    /// Per-user personal store, readable without elevation
    #[value(name = "user")]
    UserPersonal,
    /// Machine-wide personal store, usually requires root
    #[value(name = "machine")]
    MachinePersonal,
}

impl fmt::Display for StoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreScope::UserPersonal => write!(f, "CurrentUser\\My"),
            StoreScope::MachinePersonal => write!(f, "LocalMachine\\My"),
        }
    }
}

/// Reference to a certificate as enumerated from a store.
///
/// Read-only snapshot taken at enumeration time.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateRef {
    /// Store the certificate was enumerated from
    pub scope: StoreScope,
    /// Opaque store locator (a bundle file path for the directory store)
    pub locator: String,
    /// Subject distinguished name
    pub subject: String,
    /// Friendly name
    pub friendly_name: String,
    /// Uppercase hex SHA-1 fingerprint of the certificate DER
    pub thumbprint: String,
    /// Not-after timestamp
    pub not_after: DateTime<Utc>,
    /// Whether a private key is available for export
    pub has_private_key: bool,
}

impl CertificateRef {
    /// Friendly name, falling back to the subject common name
    pub fn display_name(&self) -> String {
        if !self.friendly_name.is_empty() {
            return self.friendly_name.clone();
        }
        extract_cn(&self.subject)
    }

    /// Whether the certificate has expired
    pub fn is_expired(&self) -> bool {
        self.not_after < Utc::now()
    }

    /// Days until expiry (negative when expired)
    pub fn days_until_expiry(&self) -> i64 {
        (self.not_after - Utc::now()).num_days()
    }

    /// Whether `thumbprint` identifies this certificate, ignoring case and separators
    pub fn matches_thumbprint(&self, thumbprint: &str) -> bool {
        let wanted: String = thumbprint
            .chars()
            .filter(|c| c.is_ascii_hexdigit())
            .collect();
        !wanted.is_empty() && self.thumbprint.eq_ignore_ascii_case(&wanted)
    }
}

/// Extract common name from a distinguished name string
fn extract_cn(dn: &str) -> String {
    for part in dn.split(',') {
        let part = part.trim();
        if let Some(cn) = part.strip_prefix("CN=") {
            return cn.to_string();
        }
    }
    dn.to_string()
}
