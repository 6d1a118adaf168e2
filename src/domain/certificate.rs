use std::fmt;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use x509_parser::prelude::*;

use super::error::PemError;

const ALGORITHM_NAMES: &[(&str, &str)] = &[
    ("2.16.840.1.101.3.4.3.17", "ML-DSA-44"),
    ("2.16.840.1.101.3.4.3.18", "ML-DSA-65"),
    ("2.16.840.1.101.3.4.3.19", "ML-DSA-87"),
    // Round-3 Dilithium OIDs still found in early PQC test PKIs
    ("1.3.6.1.4.1.2.267.7.4.4", "Dilithium2"),
    ("1.3.6.1.4.1.2.267.7.6.5", "Dilithium3"),
    ("1.3.6.1.4.1.2.267.7.8.7", "Dilithium5"),
    ("1.3.101.112", "Ed25519"),
    ("1.3.101.113", "Ed448"),
    ("1.2.840.113549.1.1.1", "RSA"),
    ("1.2.840.10045.2.1", "EC"),
    ("1.2.840.113549.1.1.11", "SHA256withRSA"),
    ("1.2.840.113549.1.1.12", "SHA384withRSA"),
    ("1.2.840.113549.1.1.13", "SHA512withRSA"),
    ("1.2.840.10045.4.3.2", "SHA256withECDSA"),
    ("1.2.840.10045.4.3.3", "SHA384withECDSA"),
    ("1.2.840.10045.4.3.4", "SHA512withECDSA"),
];

/// Human-readable name for a key or signature algorithm OID.
pub fn algorithm_name(oid: &str) -> Option<&'static str> {
    ALGORITHM_NAMES
        .iter()
        .find(|(known, _)| *known == oid)
        .map(|(_, name)| *name)
}

/// Basic-constraints state of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaMarker {
    Absent,
    EndEntity,
    Authority { path_len: Option<u32> },
}

/// An X.509 certificate kept as DER, with the fields the store needs
/// extracted once at parse time.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    subject_raw: Vec<u8>,
    issuer_raw: Vec<u8>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    public_key_oid: String,
    public_key: Vec<u8>,
    signature_oid: String,
    signature: Vec<u8>,
    tbs: Vec<u8>,
    ca_marker: CaMarker,
    digital_signature: Option<bool>,
}

impl Certificate {
    pub fn from_der(der: Vec<u8>) -> Result<Self, PemError> {
        let invalid = |reason: String| PemError::NotACertificate(reason);

        let (_, cert) = parse_x509_certificate(&der)
            .map_err(|e| invalid(format!("invalid X.509 structure: {}", e)))?;

        let not_before = to_datetime(cert.validity().not_before.timestamp())
            .ok_or_else(|| invalid("notBefore out of range".to_string()))?;
        let not_after = to_datetime(cert.validity().not_after.timestamp())
            .ok_or_else(|| invalid("notAfter out of range".to_string()))?;

        let ca_marker = match cert
            .basic_constraints()
            .map_err(|e| invalid(format!("malformed basicConstraints: {}", e)))?
        {
            None => CaMarker::Absent,
            Some(ext) if ext.value.ca => CaMarker::Authority {
                path_len: ext.value.path_len_constraint,
            },
            Some(_) => CaMarker::EndEntity,
        };

        let digital_signature = cert
            .key_usage()
            .map_err(|e| invalid(format!("malformed keyUsage: {}", e)))?
            .map(|ext| ext.value.digital_signature());

        let spki = cert.public_key();

        let parsed = Self {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            subject_raw: cert.subject().as_raw().to_vec(),
            issuer_raw: cert.issuer().as_raw().to_vec(),
            not_before,
            not_after,
            public_key_oid: spki.algorithm.algorithm.to_id_string(),
            public_key: spki.subject_public_key.data.to_vec(),
            signature_oid: cert.signature_algorithm.algorithm.to_id_string(),
            signature: cert.signature_value.data.to_vec(),
            tbs: cert.tbs_certificate.as_ref().to_vec(),
            ca_marker,
            digital_signature,
            der: Vec::new(),
        };

        Ok(Self { der, ..parsed })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn to_pem(&self) -> String {
        ::pem::encode(&::pem::Pem::new("CERTIFICATE", self.der.clone()))
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn public_key_oid(&self) -> &str {
        &self.public_key_oid
    }

    pub fn public_key_algorithm(&self) -> Option<&'static str> {
        algorithm_name(&self.public_key_oid)
    }

    pub fn signature_algorithm(&self) -> Option<&'static str> {
        algorithm_name(&self.signature_oid)
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// DER of the to-be-signed portion, the input of the issuer's signature.
    pub fn tbs_der(&self) -> &[u8] {
        &self.tbs
    }

    pub fn ca_marker(&self) -> CaMarker {
        self.ca_marker
    }

    /// `None` when the keyUsage extension is absent.
    pub fn digital_signature_usage(&self) -> Option<bool> {
        self.digital_signature
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    pub fn is_issued_by(&self, ca: &Certificate) -> bool {
        self.issuer_raw == ca.subject_raw
    }

    pub fn fingerprint(&self) -> String {
        Sha256::digest(&self.der)
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("not_after", &self.not_after)
            .finish()
    }
}

fn to_datetime(timestamp: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    PrivateKey,
    TrustedCertificate,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::PrivateKey => f.write_str("key"),
            EntryKind::TrustedCertificate => f.write_str("trusted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    pub alias: String,
    pub kind: EntryKind,
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub currently_valid: bool,
    pub algorithm: String,
    pub fingerprint: String,
}

impl CertificateSummary {
    pub fn new(alias: &str, kind: EntryKind, cert: &Certificate, now: DateTime<Utc>) -> Self {
        Self {
            alias: alias.to_string(),
            kind,
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            not_before: cert.not_before(),
            not_after: cert.not_after(),
            currently_valid: cert.is_valid_at(now),
            algorithm: cert
                .public_key_algorithm()
                .map(str::to_string)
                .unwrap_or_else(|| cert.public_key_oid().to_string()),
            fingerprint: cert.fingerprint(),
        }
    }
}
