//! `export` command: store → PKCS#12 → PEM

use crate::cert_ops::{ExportRequest, Pipeline};
use crate::cli::{interactive, ExportArgs};
use crate::config::Settings;
use crate::models::{CertificateRef, PipelineState};
use crate::store::{CertificateStore, DirectoryStore};
use anyhow::{bail, Context};

pub async fn run_export(settings: &Settings, args: &ExportArgs) -> anyhow::Result<PipelineState> {
    let store = DirectoryStore::new(settings.store.clone());
    let certificate = select(&store, args)?;
    let password = interactive::read_password(args.output.password_env.as_deref(), true)?;

    let request = ExportRequest {
        certificate,
        pfx_path: args.pfx.clone(),
        output_dir: args.output.out_dir.clone(),
        policy: args
            .output
            .on_conflict
            .unwrap_or(settings.output.conflict_policy),
        toolchain_path: args.output.openssl.clone(),
    };
    let thumbprint = request.certificate.thumbprint.clone();

    let sink = super::status_sink(args.output.json);
    let report = Pipeline::new(&store, settings, sink.as_ref())
        .run(request, password)
        .await;
    drop(sink);

    super::finish(settings, "export", Some(&thumbprint), &report, args.output.json)?;
    Ok(report.state)
}

fn select(store: &DirectoryStore, args: &ExportArgs) -> anyhow::Result<CertificateRef> {
    if let Some(thumbprint) = &args.thumbprint {
        return store
            .find_by_thumbprint(args.scope, thumbprint)
            .with_context(|| format!("Failed to read the {} store", args.scope))?
            .with_context(|| {
                format!(
                    "No certificate with thumbprint {} in {}",
                    thumbprint, args.scope
                )
            });
    }

    if !console::Term::stdout().is_term() {
        bail!("No thumbprint given and no terminal to choose one (run `pfx-export list`)");
    }
    let certs = store.list_certificates(args.scope)?;
    interactive::select_certificate(&certs)
}
