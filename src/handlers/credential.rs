use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::cli::input;
use crate::context::StoreContext;

pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn handle_import(
    ctx: &mut StoreContext,
    cert: &Path,
    key: &Path,
    ca: &Path,
    alias: &str,
) -> Result<()> {
    let subject_pem = read_input(cert)?;
    let key_pem = zeroize::Zeroizing::new(read_input(key)?);
    let ca_pem = read_input(ca)?;

    let password = ctx.password()?;
    let report = ctx
        .manager
        .import_credential(&subject_pem, &key_pem, &ca_pem, alias, password.expose())?;

    println!("✓ Credential '{}' imported ({})", alias, report.algorithm);
    for line in report.diagnostics.iter().filter(|l| l.starts_with("CA linkage")) {
        println!("  {}", line);
    }
    Ok(())
}

pub fn handle_trust(ctx: &mut StoreContext, cert: &Path, alias: &str) -> Result<()> {
    let cert_pem = read_input(cert)?;

    let password = ctx.password()?;
    let certificate = ctx
        .manager
        .import_trusted_certificate(&cert_pem, alias, password.expose())?;

    println!("✓ Trusted certificate '{}' stored", alias);
    println!("  Subject: {}", certificate.subject());
    println!("  SHA-256: {}", certificate.fingerprint());
    Ok(())
}

pub fn handle_list(ctx: &mut StoreContext) -> Result<()> {
    let password = ctx.password()?;
    let summaries = ctx.manager.list_certificates(password.expose())?;

    if summaries.is_empty() {
        println!("No certificates stored.");
        return Ok(());
    }

    println!("\nStored certificates:");
    for summary in summaries {
        let status = if summary.currently_valid { "valid" } else { "NOT VALID" };
        println!("\n  {} [{}] ({})", summary.alias, summary.kind, status);
        println!("    Subject:   {}", summary.subject);
        println!("    Issuer:    {}", summary.issuer);
        println!(
            "    Validity:  {} .. {}",
            summary.not_before.format("%Y-%m-%d"),
            summary.not_after.format("%Y-%m-%d")
        );
        println!("    Algorithm: {}", summary.algorithm);
        println!("    SHA-256:   {}", summary.fingerprint);
    }
    Ok(())
}

pub fn handle_rm(ctx: &mut StoreContext, alias: &str) -> Result<()> {
    if !input::confirm_remove(alias)? {
        println!("Cancelled.");
        return Ok(());
    }

    let password = ctx.password()?;
    ctx.manager.remove_credential(alias, password.expose())?;
    println!("✓ '{}' removed", alias);
    Ok(())
}
