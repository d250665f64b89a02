//! Output formatting module
//!
//! Provides:
//! - Status sinks for pipeline events (console, tracing, collecting)
//! - Certificate and run history tables
//! - Run summaries as rich terminal output or JSON
//! - The run history archive

pub mod history;
pub mod sink;
pub mod summary;
pub mod tables;

pub use history::RunRecord;
pub use sink::{CollectingSink, ConsoleSink, TracingSink};
pub use summary::{print_header, print_json, print_report, print_report_json, ReportJson};
pub use tables::{format_certificates, format_history, print_certificates, print_history};
