//! Interactive prompts: certificate selection and password entry

use crate::cert_ops::SecretHandle;
use crate::models::CertificateRef;
use anyhow::{bail, Context};
use dialoguer::{theme::ColorfulTheme, Password, Select};

/// Label shown for a certificate in the selection list
fn selection_label(cert: &CertificateRef) -> String {
    let key = if cert.has_private_key { "" } else { "  [no private key]" };
    format!(
        "{}  {}  expires {}{}",
        cert.display_name(),
        &cert.thumbprint[..cert.thumbprint.len().min(8)],
        cert.not_after.format("%Y-%m-%d"),
        key
    )
}

/// Let the user pick one certificate
pub fn select_certificate(certs: &[CertificateRef]) -> anyhow::Result<CertificateRef> {
    if certs.is_empty() {
        bail!("No certificates found in the selected store");
    }

    let items: Vec<String> = certs.iter().map(selection_label).collect();
    let default = certs.iter().position(|c| c.has_private_key).unwrap_or(0);
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Certificate to export")
        .items(&items)
        .default(default)
        .interact()
        .context("Certificate selection cancelled")?;

    Ok(certs[selection].clone())
}

/// Obtain the archive password from `env_var`, or prompt for it.
///
/// `confirm` asks twice, for passwords that will encrypt a new archive.
pub fn read_password(env_var: Option<&str>, confirm: bool) -> anyhow::Result<SecretHandle> {
    if let Some(var) = env_var {
        return SecretHandle::from_env(var)
            .with_context(|| format!("Environment variable {} is missing or empty", var));
    }

    if !console::Term::stderr().is_term() {
        bail!("No terminal to prompt for a password (use --password-env)");
    }

    let theme = ColorfulTheme::default();
    let mut prompt = Password::with_theme(&theme).with_prompt("PKCS#12 password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    let password = prompt.interact().context("Password entry cancelled")?;
    Ok(SecretHandle::new(password)?)
}
