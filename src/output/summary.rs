//! Run summaries: terminal and JSON

use crate::cert_ops::PipelineReport;
use crate::models::{ChainStatus, PemArtifactSet, PipelineState, StatusEvent};
use crate::utils::progress::print_warning;
use console::style;
use serde::Serialize;
use std::path::PathBuf;

/// Print section header
pub fn print_header(title: &str) {
    println!();
    println!("{}", style(format!("━━━ {} ━━━", title)).cyan().bold());
    println!();
}

/// Print the outcome of a run
pub fn print_report(report: &PipelineReport) {
    print_header("Result");

    if let Some(pfx) = &report.pfx_path {
        println!("  {:<12} {}", style("Archive").bold(), pfx.display());
    }

    if let Some(status) = &report.chain {
        if status.is_degraded() {
            print_warning(&format!("Chain {}", status));
        } else {
            println!("  {:<12} {}", style("Chain").bold(), status);
        }
    }

    if let Some(set) = &report.artifacts {
        print_artifacts(set);
    }

    if let Some(error) = &report.error {
        println!();
        println!(
            "  {} {}",
            style("✗").red(),
            style(format!("Stopped at {}: {}", error.stage, error.source)).red()
        );
        if let Some(hint) = error.remediation() {
            println!("  {} {}", style("→").cyan(), hint);
        }
        if report.state == PipelineState::Failed && report.pfx_path.is_some() {
            println!(
                "  {} The PKCS#12 archive was kept and can be converted later with `pfx-export convert`",
                style("ℹ").cyan()
            );
        }
    }
    println!();
}

fn print_artifacts(set: &PemArtifactSet) {
    println!("  {:<12} {}", style("Output").bold(), set.output_dir.display());
    for (label, path) in [
        ("cert", &set.cert),
        ("privkey", &set.private_key),
        ("chain", &set.chain),
        ("fullchain", &set.full_chain),
    ] {
        println!("    {} {:<10} {}", style("✓").green(), label, path.display());
    }
    println!();
    print_warning(&format!(
        "{} is NOT passphrase protected; keep it readable only by the service account",
        set.private_key.display()
    ));
}

/// JSON view of a run
#[derive(Serialize)]
pub struct ReportJson<'a> {
    pub state: PipelineState,
    pub pfx_path: Option<&'a PathBuf>,
    pub chain: Option<&'a ChainStatus>,
    pub artifacts: Option<&'a PemArtifactSet>,
    pub error: Option<ErrorJson>,
    pub events: &'a [StatusEvent],
}

#[derive(Serialize)]
pub struct ErrorJson {
    pub stage: PipelineState,
    pub message: String,
    pub remediation: Option<&'static str>,
}

impl<'a> From<&'a PipelineReport> for ReportJson<'a> {
    fn from(report: &'a PipelineReport) -> Self {
        Self {
            state: report.state,
            pfx_path: report.pfx_path.as_ref(),
            chain: report.chain.as_ref(),
            artifacts: report.artifacts.as_ref(),
            error: report.error.as_ref().map(|e| ErrorJson {
                stage: e.stage,
                message: e.source.to_string(),
                remediation: e.remediation(),
            }),
            events: &report.events,
        }
    }
}

/// Print a run as pretty JSON to stdout
pub fn print_report_json(report: &PipelineReport) -> serde_json::Result<()> {
    let json = serde_json::to_string_pretty(&ReportJson::from(report))?;
    println!("{}", json);
    Ok(())
}

/// Print any serializable value as pretty JSON to stdout
pub fn print_json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert_ops::PipelineError;
    use crate::utils::{DecomposeError, ToolkitError};

    #[test]
    fn test_json_report_carries_stage_and_hint() {
        let report = PipelineReport {
            state: PipelineState::Failed,
            pfx_path: Some(PathBuf::from("/tmp/out.pfx")),
            chain: Some(ChainStatus::Complete { intermediates: 0 }),
            artifacts: None,
            error: Some(PipelineError {
                stage: PipelineState::Decomposing,
                source: ToolkitError::Decompose(DecomposeError::ToolchainNotFound {
                    searched: "/bad/openssl".to_string(),
                }),
            }),
            events: vec![StatusEvent::new(PipelineState::Failed, "not found")],
        };

        let value = serde_json::to_value(ReportJson::from(&report)).unwrap();
        assert_eq!(value["state"], "Failed");
        assert_eq!(value["error"]["stage"], "Decomposing");
        assert!(value["error"]["message"]
            .as_str()
            .unwrap()
            .contains("/bad/openssl"));
        assert!(value["error"]["remediation"].is_string());
        assert_eq!(value["pfx_path"], "/tmp/out.pfx");
    }
}
