//! Pipeline coordinator
//!
//! Sequences export and decomposition for one run and reports every stage
//! transition to a [`StatusSink`]. Run-scoped state (request, password,
//! artifacts) lives here, never in the presentation layer.

use crate::cert_ops::decompose;
use crate::cert_ops::pfx::PfxExporter;
use crate::cert_ops::secret::SecretHandle;
use crate::cert_ops::toolchain;
use crate::config::Settings;
use crate::models::{
    CertificateRef, ChainStatus, OutputConflictPolicy, PemArtifactSet, PfxArtifact,
    PipelineState, StatusEvent,
};
use crate::store::CertificateStore;
use crate::utils::{DecomposeError, ExportError, SecretError, ToolkitError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Inputs for a full export → decompose run
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub certificate: CertificateRef,
    pub pfx_path: PathBuf,
    pub output_dir: PathBuf,
    pub policy: OutputConflictPolicy,
    /// Overrides toolchain discovery when set
    pub toolchain_path: Option<PathBuf>,
}

/// Inputs for decomposing an existing archive
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub pfx_path: PathBuf,
    pub output_dir: PathBuf,
    pub policy: OutputConflictPolicy,
    pub toolchain_path: Option<PathBuf>,
}

/// Receives pipeline status events
pub trait StatusSink {
    fn emit(&self, event: &StatusEvent);
}

impl<F: Fn(&StatusEvent)> StatusSink for F {
    fn emit(&self, event: &StatusEvent) {
        self(event)
    }
}

/// A failed or aborted run: the stage it stopped in and why
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    pub stage: PipelineState,
    pub source: ToolkitError,
}

impl PipelineError {
    pub fn remediation(&self) -> Option<&'static str> {
        match &self.source {
            ToolkitError::Export(e) => e.remediation(),
            ToolkitError::Decompose(e) => e.remediation(),
            ToolkitError::Secret(_) => Some("Supply a non-empty export password"),
        }
    }
}

/// Outcome of one pipeline run
#[derive(Debug)]
pub struct PipelineReport {
    pub state: PipelineState,
    /// Archive written or consumed by the run, kept even when decomposition fails
    pub pfx_path: Option<PathBuf>,
    pub chain: Option<ChainStatus>,
    pub artifacts: Option<PemArtifactSet>,
    pub error: Option<PipelineError>,
    pub events: Vec<StatusEvent>,
}

impl PipelineReport {
    pub fn is_complete(&self) -> bool {
        self.state == PipelineState::Complete
    }
}

/// Tracks state and events for a single run
struct Run<'s> {
    sink: &'s dyn StatusSink,
    state: PipelineState,
    events: Vec<StatusEvent>,
    pfx_path: Option<PathBuf>,
    chain: Option<ChainStatus>,
    artifacts: Option<PemArtifactSet>,
}

impl<'s> Run<'s> {
    fn new(sink: &'s dyn StatusSink) -> Self {
        Self {
            sink,
            state: PipelineState::Idle,
            events: Vec::new(),
            pfx_path: None,
            chain: None,
            artifacts: None,
        }
    }

    fn transition(&mut self, next: PipelineState, message: impl Into<String>) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        let event = StatusEvent::new(next, message);
        tracing::debug!(from = %self.state, to = %next, "{}", event.message);
        self.state = next;
        self.sink.emit(&event);
        self.events.push(event);
    }

    fn abort(mut self, source: ToolkitError) -> PipelineReport {
        let stage = self.state;
        self.transition(PipelineState::Aborted, source.to_string());
        self.finish(Some(PipelineError { stage, source }))
    }

    fn fail(mut self, source: ToolkitError) -> PipelineReport {
        let stage = self.state;
        tracing::error!("{} failed: {}", stage, source);
        self.transition(PipelineState::Failed, source.to_string());
        self.finish(Some(PipelineError { stage, source }))
    }

    fn finish(self, error: Option<PipelineError>) -> PipelineReport {
        debug_assert!(self.state.is_terminal(), "run finished in {}", self.state);
        PipelineReport {
            state: self.state,
            pfx_path: self.pfx_path,
            chain: self.chain,
            artifacts: self.artifacts,
            error,
            events: self.events,
        }
    }
}

/// Runs the export/convert pipeline against a store
pub struct Pipeline<'a> {
    store: &'a dyn CertificateStore,
    settings: &'a Settings,
    sink: &'a dyn StatusSink,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        store: &'a dyn CertificateStore,
        settings: &'a Settings,
        sink: &'a dyn StatusSink,
    ) -> Self {
        Self {
            store,
            settings,
            sink,
        }
    }

    /// Export `request.certificate` to PKCS#12, then decompose it to PEM.
    ///
    /// The password is zeroed once the last toolchain invocation returns, or
    /// as soon as the run stops on an error.
    pub async fn run(&self, request: ExportRequest, password: SecretHandle) -> PipelineReport {
        let mut run = Run::new(self.sink);
        run.transition(
            PipelineState::Validating,
            format!(
                "Validating export of {} ({})",
                request.certificate.display_name(),
                request.certificate.thumbprint
            ),
        );

        if !request.certificate.has_private_key {
            return run.abort(
                ExportError::NoPrivateKey {
                    thumbprint: request.certificate.thumbprint.clone(),
                    subject: request.certificate.subject.clone(),
                }
                .into(),
            );
        }
        if password.is_released() {
            return run.abort(SecretError::Released.into());
        }

        run.transition(
            PipelineState::Exporting,
            format!("Exporting to {}", request.pfx_path.display()),
        );
        let exporter = PfxExporter::new(self.store);
        let pfx = match exporter.export_to_pfx(
            &request.certificate,
            &request.pfx_path,
            password,
            request.policy,
        ) {
            Ok(pfx) => pfx,
            Err(e) => return run.fail(e.into()),
        };
        run.pfx_path = Some(pfx.path.clone());
        run.chain = Some(pfx.chain.clone());

        self.decompose_stage(
            run,
            pfx,
            &request.output_dir,
            request.policy,
            request.toolchain_path.as_deref(),
        )
        .await
    }

    /// Decompose an existing archive without touching the store
    pub async fn decompose_only(
        &self,
        request: ConvertRequest,
        password: SecretHandle,
    ) -> PipelineReport {
        let mut run = Run::new(self.sink);
        run.transition(
            PipelineState::Validating,
            format!("Validating {}", request.pfx_path.display()),
        );

        if password.is_released() {
            return run.abort(SecretError::Released.into());
        }
        if !request.pfx_path.is_file() {
            return run.abort(
                DecomposeError::PfxUnreadable {
                    path: request.pfx_path.clone(),
                    message: "not a file".to_string(),
                }
                .into(),
            );
        }

        run.pfx_path = Some(request.pfx_path.clone());
        let pfx = PfxArtifact::existing(request.pfx_path, password);
        self.decompose_stage(
            run,
            pfx,
            &request.output_dir,
            request.policy,
            request.toolchain_path.as_deref(),
        )
        .await
    }

    async fn decompose_stage(
        &self,
        mut run: Run<'_>,
        mut pfx: PfxArtifact,
        output_dir: &Path,
        policy: OutputConflictPolicy,
        toolchain_path: Option<&Path>,
    ) -> PipelineReport {
        let message = match &pfx.chain {
            ChainStatus::Degraded(e) => format!(
                "Decomposing {} into {} ({})",
                pfx.path.display(),
                output_dir.display(),
                e
            ),
            _ => format!(
                "Decomposing {} into {}",
                pfx.path.display(),
                output_dir.display()
            ),
        };
        run.transition(PipelineState::Decomposing, message);

        let result = self.decompose(&pfx, output_dir, policy, toolchain_path).await;
        pfx.password.release();

        match result {
            Ok(set) => {
                run.transition(
                    PipelineState::Complete,
                    format!("Wrote PEM files to {}", set.output_dir.display()),
                );
                run.artifacts = Some(set);
                run.finish(None)
            }
            Err(e) => run.fail(e.into()),
        }
    }

    async fn decompose(
        &self,
        pfx: &PfxArtifact,
        output_dir: &Path,
        policy: OutputConflictPolicy,
        toolchain_path: Option<&Path>,
    ) -> Result<PemArtifactSet, DecomposeError> {
        let path = match toolchain_path {
            Some(p) => p.to_path_buf(),
            None => toolchain::discover(&self.settings.toolchain)?,
        };
        decompose::decompose(&path, self.settings, pfx, output_dir, policy).await
    }
}
