use anyhow::Result;
use std::path::Path;

use super::credential::read_input;
use crate::context::Manager;
use crate::domain::{pem_object, ValidationReport, VerificationFlow};

pub fn handle_verify(
    manager: &Manager,
    cert: &Path,
    input: &Path,
    signature: &Path,
) -> Result<()> {
    let mut flow = VerificationFlow::new();
    flow.select_certificate(pem_object::parse_certificate(&read_input(cert)?)?);
    flow.select_document(read_input(input)?);
    flow.select_signature(read_input(signature)?);
    if !flow.can_verify() {
        return Err(anyhow::anyhow!(
            "Certificate, document and signature are all required"
        ));
    }

    let outcome = flow
        .verify(|certificate, document, signature| {
            manager.verify_document(certificate, document, signature)
        })?
        .cloned();

    let Some(outcome) = outcome else {
        return Err(anyhow::anyhow!("Verification produced no result"));
    };

    if !outcome.is_valid() {
        return Err(anyhow::anyhow!(
            "The signature is NOT valid: it does not match the document or the given certificate"
        ));
    }

    println!("✓ The signature is VALID.");
    if let Some(report) = &outcome.report {
        print_certificate_status(report);
        if !outcome.certificate_acceptable() {
            println!("\nTechnical details:\n{}", report.diagnostics_text());
            return Err(anyhow::anyhow!(
                "Signature is valid but the signer certificate is not suitable for signing"
            ));
        }
    }
    Ok(())
}

pub fn handle_validate(manager: &Manager, cert: &Path, ca: Option<&Path>) -> Result<()> {
    let subject_pem = read_input(cert)?;
    let ca_pem = ca.map(read_input).transpose()?;

    let report = manager.validate(&subject_pem, ca_pem.as_deref())?;

    println!("{}", report.diagnostics_text());
    println!();
    if report.acceptable_for_signing() {
        println!("✓ Certificate is suitable for electronic signatures");
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Certificate is NOT suitable for electronic signatures"
        ))
    }
}

fn print_certificate_status(report: &ValidationReport) {
    if report.time_valid {
        println!("✓ Certificate is within its validity period.");
    } else {
        println!("✗ Certificate is NOT currently valid (expired or not yet valid).");
    }
    if !report.is_end_entity {
        println!("✗ Certificate is a CA certificate.");
    }
    if !report.key_usage_ok {
        println!("✗ Certificate is not suitable for electronic signatures.");
    }
}
