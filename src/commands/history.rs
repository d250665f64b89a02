//! `history` command

use crate::cli::HistoryArgs;
use crate::config::Settings;
use crate::output::{self, history};
use anyhow::Context;

pub fn run_history(settings: &Settings, args: &HistoryArgs) -> anyhow::Result<()> {
    let path = &settings.history.path;
    let records = history::read_all(path)
        .with_context(|| format!("Failed to read run history {}", path.display()))?;
    let recent = &records[records.len().saturating_sub(args.limit)..];

    if args.json {
        output::print_json(&recent)?;
        return Ok(());
    }

    output::print_header(&format!("History ({})", path.display()));
    if recent.is_empty() {
        println!("  No runs recorded");
        return Ok(());
    }
    output::print_history(recent);
    Ok(())
}
