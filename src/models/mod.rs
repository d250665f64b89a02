//! Data models for pfx-export
//!
//! This module contains the data structures passed between the store, the
//! export/convert stages, and the front ends.

pub mod artifacts;
pub mod certificate;
pub mod status;

pub use artifacts::{ChainBuildError, ChainStatus, OutputConflictPolicy, PemArtifactSet, PfxArtifact};
pub use certificate::{CertificateRef, StoreScope};
pub use status::{PipelineState, StatusEvent};
