//! Command implementations for pfx-export

pub mod convert;
pub mod export;
pub mod history;
pub mod list;

pub use convert::run_convert;
pub use export::run_export;
pub use history::run_history;
pub use list::run_list;

use crate::cert_ops::{PipelineReport, StatusSink};
use crate::config::Settings;
use crate::output::{self, history as run_history_log, ConsoleSink, RunRecord, TracingSink};

/// Console output for interactive runs, tracing only for `--json`
pub(crate) fn status_sink(json: bool) -> Box<dyn StatusSink> {
    if json {
        Box::new(TracingSink)
    } else {
        Box::new(ConsoleSink::new())
    }
}

/// Archive and print the outcome of a pipeline run
pub(crate) fn finish(
    settings: &Settings,
    command: &str,
    thumbprint: Option<&str>,
    report: &PipelineReport,
    json: bool,
) -> anyhow::Result<()> {
    if settings.history.enabled {
        let record = RunRecord::from_report(command, thumbprint, report);
        if let Err(e) = run_history_log::append(&settings.history.path, &record) {
            tracing::warn!(
                "Could not write run history to {}: {}",
                settings.history.path.display(),
                e
            );
        }
    }

    if json {
        output::print_report_json(report)?;
    } else {
        output::print_report(report);
    }
    Ok(())
}
