use pkcs8::der::{Decode, Encode};
use pkcs8::PrivateKeyInfo;
use zeroize::Zeroizing;

use super::certificate::{algorithm_name, Certificate};
use super::error::PemError;
use super::signature::PrivateKeyMaterial;

const CERTIFICATE_LABELS: &[&str] = &["CERTIFICATE", "X509 CERTIFICATE"];
const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
const ENCRYPTED_PRIVATE_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// The single object decoded from a PEM blob.
#[derive(Debug)]
pub enum PemObject {
    Certificate(Certificate),
    /// PKCS#8 v1 PrivateKeyInfo.
    PrivateKey(PrivateKeyMaterial),
    /// PKCS#8 v2 OneAsymmetricKey carrying the public half as well.
    PrivateKeyPair {
        private_key: PrivateKeyMaterial,
        public_key: Vec<u8>,
    },
    EncryptedPrivateKey,
}

impl PemObject {
    pub fn kind_name(&self) -> &'static str {
        match self {
            PemObject::Certificate(_) => "CERTIFICATE",
            PemObject::PrivateKey(_) => "PRIVATE KEY",
            PemObject::PrivateKeyPair { .. } => "PRIVATE KEY (key pair)",
            PemObject::EncryptedPrivateKey => ENCRYPTED_PRIVATE_KEY_LABEL,
        }
    }
}

/// Decodes the first PEM object in `bytes`.
pub fn parse(bytes: &[u8]) -> Result<PemObject, PemError> {
    let block = pem::parse(bytes).map_err(|_| PemError::EmptyOrMalformed)?;

    let encrypted_header = block
        .headers()
        .get("Proc-Type")
        .map(|value| value.to_ascii_uppercase().contains("ENCRYPTED"))
        .unwrap_or(false);

    let tag = block.tag();
    if tag == ENCRYPTED_PRIVATE_KEY_LABEL || encrypted_header {
        return Ok(PemObject::EncryptedPrivateKey);
    }

    if CERTIFICATE_LABELS.contains(&tag) {
        return Certificate::from_der(block.into_contents()).map(PemObject::Certificate);
    }

    if tag == PRIVATE_KEY_LABEL {
        let der = Zeroizing::new(block.into_contents());
        return decode_pkcs8(&der);
    }

    Err(PemError::UnsupportedPemObjectKind(tag.to_string()))
}

pub fn parse_certificate(bytes: &[u8]) -> Result<Certificate, PemError> {
    match parse(bytes) {
        Ok(PemObject::Certificate(cert)) => Ok(cert),
        Ok(other) => Err(PemError::NotACertificate(other.kind_name().to_string())),
        Err(PemError::UnsupportedPemObjectKind(kind)) => Err(PemError::NotACertificate(kind)),
        Err(e) => Err(e),
    }
}

pub fn parse_private_key(bytes: &[u8]) -> Result<PrivateKeyMaterial, PemError> {
    match parse(bytes)? {
        PemObject::PrivateKey(key) => Ok(key),
        PemObject::PrivateKeyPair { private_key, .. } => Ok(private_key),
        PemObject::EncryptedPrivateKey => Err(PemError::UnsupportedEncryptedKey),
        other @ PemObject::Certificate(_) => Err(PemError::UnsupportedPemObjectKind(
            other.kind_name().to_string(),
        )),
    }
}

fn decode_pkcs8(der: &[u8]) -> Result<PemObject, PemError> {
    let info = PrivateKeyInfo::from_der(der)
        .map_err(|e| PemError::InvalidPrivateKey(e.to_string()))?;

    let oid = info.algorithm.oid.to_string();
    let algorithm = algorithm_name(&oid).map(str::to_string).unwrap_or(oid);

    match info.public_key {
        None => Ok(PemObject::PrivateKey(PrivateKeyMaterial::new(
            algorithm,
            Zeroizing::new(der.to_vec()),
        ))),
        Some(public_key) => {
            let private_half = PrivateKeyInfo {
                algorithm: info.algorithm,
                private_key: info.private_key,
                public_key: None,
            };
            let private_der = private_half
                .to_der()
                .map_err(|e| PemError::InvalidPrivateKey(e.to_string()))?;

            Ok(PemObject::PrivateKeyPair {
                private_key: PrivateKeyMaterial::new(algorithm, Zeroizing::new(private_der)),
                public_key: public_key.to_vec(),
            })
        }
    }
}
