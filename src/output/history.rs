//! Run history archive
//!
//! One JSON object per line, appended after every pipeline run.

use crate::cert_ops::PipelineReport;
use crate::models::PipelineState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Archived summary of one run. Never contains secret material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub state: PipelineState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pfx_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunRecord {
    pub fn from_report(command: &str, thumbprint: Option<&str>, report: &PipelineReport) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            command: command.to_string(),
            started_at: report.events.first().map(|e| e.timestamp).unwrap_or(now),
            finished_at: report.events.last().map(|e| e.timestamp).unwrap_or(now),
            state: report.state,
            thumbprint: thumbprint.map(str::to_string),
            pfx_path: report.pfx_path.clone(),
            output_dir: report.artifacts.as_ref().map(|a| a.output_dir.clone()),
            chain: report.chain.as_ref().map(|c| c.to_string()),
            error: report.error.as_ref().map(|e| e.to_string()),
        }
    }
}

/// Append `record` to the history file at `path`, creating it if needed
pub fn append(path: &Path, record: &RunRecord) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(record).map_err(io::Error::other)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

/// Read every record, skipping lines that do not parse
pub fn read_all(path: &Path) -> io::Result<Vec<RunRecord>> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::debug!("Skipping unreadable history line: {}", e),
        }
    }
    Ok(records)
}
