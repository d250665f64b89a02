//! Table rendering using comfy-table

use crate::models::{CertificateRef, PipelineState};
use crate::output::RunRecord;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, ContentArrangement, Table};

/// Days before expiry at which a certificate is highlighted
const EXPIRY_WARNING_DAYS: i64 = 30;

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);

    // Constrain table width to terminal width minus indent
    let width = crossterm::terminal::size()
        .map(|(cols, _)| cols)
        .unwrap_or(120)
        .saturating_sub(4);
    table.set_width(width);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);
    table
}

/// Format a certificate listing
pub fn format_certificates(certs: &[CertificateRef]) -> String {
    let mut table = new_table(&["Name", "Subject", "Thumbprint", "Expires", "Key"]);

    for cert in certs {
        let expires = cert.not_after.format("%Y-%m-%d").to_string();
        let expires_cell = if cert.is_expired() {
            Cell::new(format!("{} (expired)", expires)).fg(Color::Red)
        } else if cert.days_until_expiry() < EXPIRY_WARNING_DAYS {
            Cell::new(format!("{} ({}d)", expires, cert.days_until_expiry())).fg(Color::Yellow)
        } else {
            Cell::new(expires)
        };

        let key_cell = if cert.has_private_key {
            Cell::new("✓").fg(Color::Green)
        } else {
            Cell::new("✗").fg(Color::Red)
        };

        table.add_row(vec![
            Cell::new(cert.display_name()),
            Cell::new(&cert.subject),
            Cell::new(&cert.thumbprint),
            expires_cell,
            key_cell,
        ]);
    }

    table.to_string()
}

/// Print a certificate listing, indented
pub fn print_certificates(certs: &[CertificateRef]) {
    for line in format_certificates(certs).lines() {
        println!("    {}", line);
    }
}

/// Format run history, oldest first
pub fn format_history(records: &[RunRecord]) -> String {
    let mut table = new_table(&["Finished", "Command", "State", "Archive", "Detail"]);

    for record in records {
        let state = match record.state {
            PipelineState::Complete => Cell::new(record.state).fg(Color::Green),
            PipelineState::Aborted | PipelineState::Failed => {
                Cell::new(record.state).fg(Color::Red)
            }
            _ => Cell::new(record.state),
        };
        let archive = record
            .pfx_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let detail = record
            .error
            .as_deref()
            .or(record.chain.as_deref())
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(
                record
                    .finished_at
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S"),
            ),
            Cell::new(&record.command),
            state,
            Cell::new(archive),
            Cell::new(detail),
        ]);
    }

    table.to_string()
}

/// Print run history, indented
pub fn print_history(records: &[RunRecord]) {
    for line in format_history(records).lines() {
        println!("    {}", line);
    }
}
