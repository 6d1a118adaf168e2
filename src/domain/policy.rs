use chrono::{DateTime, Utc};

use super::certificate::{CaMarker, Certificate};
use super::signature::SignatureProvider;

const UNKNOWN_ALGORITHM: &str = "unknown";

/// Signature families recognised as post-quantum.
const PQC_MARKERS: &[&str] = &["ml-dsa", "dilithium"];

/// Outcome of evaluating a certificate against the signing policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub algorithm: String,
    pub is_pqc: bool,
    pub time_valid: bool,
    pub is_end_entity: bool,
    pub key_usage_ok: bool,
    pub ca_signature_checked: bool,
    pub ca_signature_ok: bool,
    pub diagnostics: Vec<String>,
}

impl ValidationReport {
    /// CA linkage is informational only.
    pub fn acceptable_for_signing(&self) -> bool {
        self.time_valid && self.is_end_entity && self.key_usage_ok
    }

    pub fn diagnostics_text(&self) -> String {
        self.diagnostics.join("\n")
    }
}

pub fn is_pqc_algorithm(name: &str) -> bool {
    let lower = name.to_lowercase();
    PQC_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Evaluates `subject` against the policy at the current time.
pub fn evaluate<P: SignatureProvider + ?Sized>(
    subject: &Certificate,
    ca: Option<&Certificate>,
    provider: &P,
) -> ValidationReport {
    evaluate_at(subject, ca, provider, Utc::now())
}

/// Every step runs regardless of earlier failures so the diagnostics
/// describe all problems at once.
pub fn evaluate_at<P: SignatureProvider + ?Sized>(
    subject: &Certificate,
    ca: Option<&Certificate>,
    provider: &P,
    now: DateTime<Utc>,
) -> ValidationReport {
    let mut diagnostics = Vec::new();

    let algorithm = subject
        .public_key_algorithm()
        .or_else(|| subject.signature_algorithm())
        .unwrap_or(UNKNOWN_ALGORITHM)
        .to_string();
    let is_pqc = is_pqc_algorithm(&algorithm);
    diagnostics.push(format!(
        "Certificate algorithm: {}{}",
        algorithm,
        if is_pqc { " (PQC)" } else { "" }
    ));

    let time_valid = if now < subject.not_before() {
        diagnostics.push(format!(
            "Validity period: NOT VALID (not yet valid, starts {})",
            subject.not_before().format("%Y-%m-%d %H:%M:%S UTC")
        ));
        false
    } else if now > subject.not_after() {
        diagnostics.push(format!(
            "Validity period: NOT VALID (certificate expired on {})",
            subject.not_after().format("%Y-%m-%d %H:%M:%S UTC")
        ));
        false
    } else {
        diagnostics.push("Validity period: OK (within notBefore/notAfter)".to_string());
        true
    };

    let is_end_entity = match subject.ca_marker() {
        CaMarker::Authority { .. } => {
            diagnostics.push(
                "BasicConstraints: CA certificate (not suitable for signing documents)"
                    .to_string(),
            );
            false
        }
        CaMarker::EndEntity => {
            diagnostics.push("BasicConstraints: end-entity certificate (not a CA)".to_string());
            true
        }
        CaMarker::Absent => {
            diagnostics.push(
                "BasicConstraints: not present, treated as end-entity certificate".to_string(),
            );
            true
        }
    };

    let key_usage_ok = match subject.digital_signature_usage() {
        None => {
            diagnostics
                .push("KeyUsage: not present (strict mode) -> NOT suitable for signing".to_string());
            false
        }
        Some(true) => {
            diagnostics.push("KeyUsage.digitalSignature: true (OK)".to_string());
            true
        }
        Some(false) => {
            diagnostics
                .push("KeyUsage.digitalSignature: false -> NOT suitable for signing".to_string());
            false
        }
    };

    let (ca_signature_checked, ca_signature_ok) = match ca {
        None => {
            diagnostics.push("CA linkage: not checked (no CA certificate supplied)".to_string());
            (false, false)
        }
        Some(ca) => (true, check_ca_linkage(subject, ca, provider, &mut diagnostics)),
    };

    ValidationReport {
        algorithm,
        is_pqc,
        time_valid,
        is_end_entity,
        key_usage_ok,
        ca_signature_checked,
        ca_signature_ok,
        diagnostics,
    }
}

fn check_ca_linkage<P: SignatureProvider + ?Sized>(
    subject: &Certificate,
    ca: &Certificate,
    provider: &P,
    diagnostics: &mut Vec<String>,
) -> bool {
    if !subject.is_issued_by(ca) {
        diagnostics.push(format!(
            "CA linkage: issuer '{}' does not match CA subject '{}' (informational)",
            subject.issuer(),
            ca.subject()
        ));
        return false;
    }

    let ca_algorithm = ca
        .public_key_algorithm()
        .unwrap_or_else(|| ca.public_key_oid());

    match provider.verify(ca_algorithm, ca.public_key(), subject.tbs_der(), subject.signature()) {
        Ok(true) => {
            diagnostics.push(format!(
                "CA linkage: signature verified with {} (informational)",
                ca_algorithm
            ));
            true
        }
        Ok(false) => {
            diagnostics.push(
                "CA linkage: signature does NOT verify against the CA key (informational)"
                    .to_string(),
            );
            false
        }
        Err(e) => {
            diagnostics.push(format!("CA linkage: could not be checked ({})", e));
            false
        }
    }
}
