//! pfx-export library
//!
//! Exports a certificate and its private key from a certificate store into a
//! password-protected PKCS#12 archive, then decomposes the archive with
//! OpenSSL into the PEM files Linux TLS servers expect:
//! `<base>-cert.pem`, `<base>-privkey.pem`, `<base>-chain.pem` and
//! `<base>-fullchain.pem`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pfx_export::cert_ops::{ExportRequest, Pipeline, SecretHandle};
//! use pfx_export::models::{OutputConflictPolicy, StoreScope};
//! use pfx_export::output::ConsoleSink;
//! use pfx_export::store::{CertificateStore, DirectoryStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = pfx_export::Settings::load_default()?;
//!     let store = DirectoryStore::new(settings.store.clone());
//!     let certificate = store.list_certificates(StoreScope::UserPersonal)?.remove(0);
//!     let sink = ConsoleSink::new();
//!     let report = Pipeline::new(&store, &settings, &sink)
//!         .run(
//!             ExportRequest {
//!                 certificate,
//!                 pfx_path: "out.pfx".into(),
//!                 output_dir: "pem".into(),
//!                 policy: OutputConflictPolicy::Abort,
//!                 toolchain_path: None,
//!             },
//!             SecretHandle::new("Test123!".to_string())?,
//!         )
//!         .await;
//!     assert!(report.is_complete());
//!     Ok(())
//! }
//! ```

pub mod cert_ops;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod output;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use cert_ops::{Pipeline, PipelineReport, SecretHandle};
pub use cli::Cli;
pub use config::Settings;
pub use models::{CertificateRef, OutputConflictPolicy, PemArtifactSet, PipelineState};
pub use utils::ToolkitError;
