//! Export and conversion pipeline
//!
//! Exports a store certificate to a password-protected PKCS#12 archive and
//! decomposes the archive into PEM files with OpenSSL.

pub mod decompose;
pub mod layout;
pub mod pfx;
pub mod runner;
pub mod secret;
pub mod toolchain;

pub use decompose::PemDecomposer;
pub use pfx::PfxExporter;
pub use runner::{
    ConvertRequest, ExportRequest, Pipeline, PipelineError, PipelineReport, StatusSink,
};
pub use secret::SecretHandle;
pub use toolchain::Toolchain;
