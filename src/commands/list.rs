//! `list` command

use crate::cli::ListArgs;
use crate::config::Settings;
use crate::output;
use crate::store::{CertificateStore, DirectoryStore};
use console::style;

pub fn run_list(settings: &Settings, args: &ListArgs) -> anyhow::Result<()> {
    let store = DirectoryStore::new(settings.store.clone());
    let certs = store.list_certificates(args.scope)?;

    if args.json {
        output::print_json(&certs)?;
        return Ok(());
    }

    output::print_header(&format!("{} ({})", args.scope, store.scope_root(args.scope).display()));
    if certs.is_empty() {
        println!("  No certificates found");
        return Ok(());
    }

    output::print_certificates(&certs);
    let exportable = certs.iter().filter(|c| c.has_private_key).count();
    println!();
    println!(
        "  {} certificate(s), {} with a private key",
        style(certs.len()).bold(),
        style(exportable).green().bold()
    );
    Ok(())
}
