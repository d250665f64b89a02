//! `convert` command: existing PKCS#12 → PEM

use crate::cert_ops::{ConvertRequest, Pipeline};
use crate::cli::{interactive, ConvertArgs};
use crate::config::Settings;
use crate::models::PipelineState;
use crate::store::DirectoryStore;

pub async fn run_convert(
    settings: &Settings,
    args: &ConvertArgs,
) -> anyhow::Result<PipelineState> {
    let password = interactive::read_password(args.output.password_env.as_deref(), false)?;
    let request = ConvertRequest {
        pfx_path: args.pfx.clone(),
        output_dir: args.output.out_dir.clone(),
        policy: args
            .output
            .on_conflict
            .unwrap_or(settings.output.conflict_policy),
        toolchain_path: args.output.openssl.clone(),
    };

    let store = DirectoryStore::new(settings.store.clone());
    let sink = super::status_sink(args.output.json);
    let report = Pipeline::new(&store, settings, sink.as_ref())
        .decompose_only(request, password)
        .await;
    drop(sink);

    super::finish(settings, "convert", None, &report, args.output.json)?;
    Ok(report.state)
}
