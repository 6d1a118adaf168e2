use std::fmt;

use zeroize::Zeroizing;

use super::error::ProviderError;

/// Signature schemes the bundled provider knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    MlDsa44,
    MlDsa65,
    MlDsa87,
    Ed25519,
}

impl SignatureAlgorithm {
    pub const ALL: [SignatureAlgorithm; 4] = [
        SignatureAlgorithm::MlDsa44,
        SignatureAlgorithm::MlDsa65,
        SignatureAlgorithm::MlDsa87,
        SignatureAlgorithm::Ed25519,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SignatureAlgorithm::MlDsa44 => "ML-DSA-44",
            SignatureAlgorithm::MlDsa65 => "ML-DSA-65",
            SignatureAlgorithm::MlDsa87 => "ML-DSA-87",
            SignatureAlgorithm::Ed25519 => "Ed25519",
        }
    }

    pub fn oid(&self) -> &'static str {
        match self {
            SignatureAlgorithm::MlDsa44 => "2.16.840.1.101.3.4.3.17",
            SignatureAlgorithm::MlDsa65 => "2.16.840.1.101.3.4.3.18",
            SignatureAlgorithm::MlDsa87 => "2.16.840.1.101.3.4.3.19",
            SignatureAlgorithm::Ed25519 => "1.3.101.112",
        }
    }

    /// Accepts the canonical name in any case, with or without the dash
    /// (`ML-DSA-65`, `mldsa65`, `ed25519`).
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        Self::ALL.into_iter().find(|alg| {
            alg.name()
                .chars()
                .filter(|c| *c != '-')
                .collect::<String>()
                .to_ascii_lowercase()
                == normalized
        })
    }

    pub fn from_oid(oid: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.oid() == oid)
    }

    pub fn is_pqc(&self) -> bool {
        !matches!(self, SignatureAlgorithm::Ed25519)
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque private key handle: the declared algorithm name plus the PKCS#8 DER
/// it was imported from. The DER is wiped when the handle is dropped.
#[derive(Clone)]
pub struct PrivateKeyMaterial {
    algorithm: String,
    pkcs8_der: Zeroizing<Vec<u8>>,
}

impl PrivateKeyMaterial {
    pub fn new(algorithm: impl Into<String>, pkcs8_der: Zeroizing<Vec<u8>>) -> Self {
        Self {
            algorithm: algorithm.into(),
            pkcs8_der,
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn pkcs8_der(&self) -> &[u8] {
        &self.pkcs8_der
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyMaterial")
            .field("algorithm", &self.algorithm)
            .field("pkcs8_der", &"<redacted>")
            .finish()
    }
}

pub struct GeneratedKeyPair {
    pub algorithm: SignatureAlgorithm,
    /// PKCS#8 v2 (OneAsymmetricKey) carrying both halves.
    pub pkcs8_der: Zeroizing<Vec<u8>>,
    pub public_key: Vec<u8>,
}

pub trait SignatureProvider {
    fn generate_keypair(&self, algorithm: &str) -> Result<GeneratedKeyPair, ProviderError>;
    /// Whether `key` can be loaded for signing, checked without signing.
    fn check_private_key(
        &self,
        algorithm: &str,
        key: &PrivateKeyMaterial,
    ) -> Result<(), ProviderError>;
    fn sign(
        &self,
        algorithm: &str,
        key: &PrivateKeyMaterial,
        data: &[u8],
    ) -> Result<Vec<u8>, ProviderError>;
    /// `Ok(false)` on a cryptographic mismatch; `Err` only when the
    /// algorithm or the key itself is unusable.
    fn verify(
        &self,
        algorithm: &str,
        public_key: &[u8],
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_lenient() {
        assert_eq!(
            SignatureAlgorithm::from_name("ML-DSA-65"),
            Some(SignatureAlgorithm::MlDsa65)
        );
        assert_eq!(
            SignatureAlgorithm::from_name("mldsa44"),
            Some(SignatureAlgorithm::MlDsa44)
        );
        assert_eq!(
            SignatureAlgorithm::from_name("ED25519"),
            Some(SignatureAlgorithm::Ed25519)
        );
        assert_eq!(SignatureAlgorithm::from_name("Dilithium3"), None);
    }

    #[test]
    fn test_oid_lookup() {
        for alg in SignatureAlgorithm::ALL {
            assert_eq!(SignatureAlgorithm::from_oid(alg.oid()), Some(alg));
        }
        assert_eq!(SignatureAlgorithm::from_oid("1.2.840.113549.1.1.1"), None);
    }
}
