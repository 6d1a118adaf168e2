use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use pkcs8::der::asn1::OctetStringRef;
use pkcs8::der::{Decode, Encode};
use pkcs8::{AlgorithmIdentifierRef, DecodePrivateKey, EncodePrivateKey, ObjectIdentifier, PrivateKeyInfo};
use pqcrypto_traits::sign::{
    DetachedSignature as _, PublicKey as _, SecretKey as _,
};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::{
    GeneratedKeyPair, PrivateKeyMaterial, ProviderError, SignatureAlgorithm, SignatureProvider,
};

/// One signature scheme. Keys arrive as PKCS#8 DER, public keys as the raw
/// subjectPublicKey bits of a certificate.
pub trait SignatureBackend: Send + Sync {
    fn algorithm(&self) -> SignatureAlgorithm;
    fn generate(&self) -> Result<GeneratedKeyPair, ProviderError>;
    /// Loads the key without signing anything.
    fn check_key(&self, pkcs8_der: &[u8]) -> Result<(), ProviderError>;
    fn sign(&self, pkcs8_der: &[u8], data: &[u8]) -> Result<Vec<u8>, ProviderError>;
    fn verify(&self, public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<bool, ProviderError>;
}

/// Explicit set of signature backends, built once at startup and handed to
/// whatever needs to sign or verify.
pub struct SignatureRegistry {
    backends: Vec<Box<dyn SignatureBackend>>,
}

impl SignatureRegistry {
    pub fn empty() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    pub fn with_default_backends() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(MlDsa44Backend));
        registry.register(Box::new(MlDsa65Backend));
        registry.register(Box::new(MlDsa87Backend));
        registry.register(Box::new(Ed25519Backend));
        registry
    }

    /// Replaces any backend already registered for the same algorithm.
    pub fn register(&mut self, backend: Box<dyn SignatureBackend>) {
        self.backends
            .retain(|existing| existing.algorithm() != backend.algorithm());
        self.backends.push(backend);
    }

    pub fn algorithms(&self) -> Vec<SignatureAlgorithm> {
        self.backends.iter().map(|b| b.algorithm()).collect()
    }

    fn backend(&self, name: &str) -> Result<&dyn SignatureBackend, ProviderError> {
        let algorithm = SignatureAlgorithm::from_name(name)
            .ok_or_else(|| ProviderError::UnsupportedAlgorithm(name.to_string()))?;

        self.backends
            .iter()
            .find(|b| b.algorithm() == algorithm)
            .map(|b| b.as_ref())
            .ok_or_else(|| ProviderError::UnsupportedAlgorithm(name.to_string()))
    }
}

impl Default for SignatureRegistry {
    fn default() -> Self {
        Self::with_default_backends()
    }
}

impl SignatureProvider for SignatureRegistry {
    fn generate_keypair(&self, algorithm: &str) -> Result<GeneratedKeyPair, ProviderError> {
        self.backend(algorithm)?.generate()
    }

    fn check_private_key(
        &self,
        algorithm: &str,
        key: &PrivateKeyMaterial,
    ) -> Result<(), ProviderError> {
        self.backend(algorithm)?.check_key(key.pkcs8_der())
    }

    fn sign(
        &self,
        algorithm: &str,
        key: &PrivateKeyMaterial,
        data: &[u8],
    ) -> Result<Vec<u8>, ProviderError> {
        let backend = self.backend(algorithm)?;
        debug!(algorithm = %backend.algorithm(), bytes = data.len(), "signing");
        backend.sign(key.pkcs8_der(), data)
    }

    fn verify(
        &self,
        algorithm: &str,
        public_key: &[u8],
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, ProviderError> {
        let backend = self.backend(algorithm)?;
        debug!(algorithm = %backend.algorithm(), bytes = data.len(), "verifying");
        backend.verify(public_key, data, signature)
    }
}

fn invalid_key(algorithm: SignatureAlgorithm, reason: impl ToString) -> ProviderError {
    ProviderError::InvalidKey {
        algorithm: algorithm.name().to_string(),
        reason: reason.to_string(),
    }
}

fn algorithm_identifier(
    algorithm: SignatureAlgorithm,
) -> Result<AlgorithmIdentifierRef<'static>, ProviderError> {
    let oid = ObjectIdentifier::new(algorithm.oid()).map_err(|e| invalid_key(algorithm, e))?;
    Ok(AlgorithmIdentifierRef {
        oid,
        parameters: None,
    })
}

/// Extracts the `privateKey` contents after checking the algorithm OID.
fn pkcs8_private_key(
    algorithm: SignatureAlgorithm,
    pkcs8_der: &[u8],
) -> Result<Zeroizing<Vec<u8>>, ProviderError> {
    let info = PrivateKeyInfo::from_der(pkcs8_der).map_err(|e| invalid_key(algorithm, e))?;
    let oid = info.algorithm.oid.to_string();
    if oid != algorithm.oid() {
        return Err(invalid_key(
            algorithm,
            format!("key is for algorithm {}", oid),
        ));
    }
    Ok(Zeroizing::new(info.private_key.to_vec()))
}

const MLDSA_SEED_LEN: usize = 32;

/// ML-DSA `privateKey` contents. Accepted: bare expanded key bytes, the
/// `expandedKey` OCTET STRING, or `both` (`SEQUENCE { seed, expandedKey }`).
/// The seed-only form is refused since the key cannot be expanded here.
fn mldsa_secret_bytes(
    algorithm: SignatureAlgorithm,
    private_key: &[u8],
    expected_len: usize,
) -> Result<Zeroizing<Vec<u8>>, ProviderError> {
    if private_key.len() == expected_len {
        return Ok(Zeroizing::new(private_key.to_vec()));
    }

    let expanded = match private_key.first() {
        Some(0x04) => OctetStringRef::from_der(private_key)
            .map_err(|e| invalid_key(algorithm, e))?
            .as_bytes()
            .to_vec(),
        Some(0x30) => {
            let [seed, expanded] = <[OctetStringRef<'_>; 2]>::from_der(private_key)
                .map_err(|e| invalid_key(algorithm, e))?;
            if seed.as_bytes().len() != MLDSA_SEED_LEN {
                return Err(invalid_key(
                    algorithm,
                    format!("seed must be {} bytes", MLDSA_SEED_LEN),
                ));
            }
            expanded.as_bytes().to_vec()
        }
        Some(0x80) => {
            return Err(invalid_key(
                algorithm,
                "seed-only private keys are not supported, export the expanded key",
            ))
        }
        _ => {
            return Err(invalid_key(
                algorithm,
                format!("unexpected private key length {}", private_key.len()),
            ))
        }
    };
    let expanded = Zeroizing::new(expanded);

    if expanded.len() != expected_len {
        return Err(invalid_key(
            algorithm,
            format!("expanded key must be {} bytes, got {}", expected_len, expanded.len()),
        ));
    }
    Ok(expanded)
}

macro_rules! mldsa_backend {
    ($name:ident, $module:ident, $algorithm:expr) => {
        pub struct $name;

        impl $name {
            fn secret_key(
                &self,
                pkcs8_der: &[u8],
            ) -> Result<pqcrypto_mldsa::$module::SecretKey, ProviderError> {
                use pqcrypto_mldsa::$module;

                let private_key = pkcs8_private_key($algorithm, pkcs8_der)?;
                let secret_bytes =
                    mldsa_secret_bytes($algorithm, &private_key, $module::secret_key_bytes())?;
                $module::SecretKey::from_bytes(&secret_bytes).map_err(|e| invalid_key($algorithm, e))
            }
        }

        impl SignatureBackend for $name {
            fn algorithm(&self) -> SignatureAlgorithm {
                $algorithm
            }

            fn generate(&self) -> Result<GeneratedKeyPair, ProviderError> {
                use pqcrypto_mldsa::$module;

                let (public_key, secret_key) = $module::keypair();
                let expanded = OctetStringRef::new(secret_key.as_bytes())
                    .and_then(|octets| octets.to_der())
                    .map(Zeroizing::new)
                    .map_err(|e| invalid_key($algorithm, e))?;

                let info = PrivateKeyInfo {
                    algorithm: algorithm_identifier($algorithm)?,
                    private_key: &expanded,
                    public_key: Some(public_key.as_bytes()),
                };
                let pkcs8_der = info
                    .to_der()
                    .map(Zeroizing::new)
                    .map_err(|e| invalid_key($algorithm, e))?;

                Ok(GeneratedKeyPair {
                    algorithm: $algorithm,
                    pkcs8_der,
                    public_key: public_key.as_bytes().to_vec(),
                })
            }

            fn check_key(&self, pkcs8_der: &[u8]) -> Result<(), ProviderError> {
                self.secret_key(pkcs8_der).map(|_| ())
            }

            fn sign(&self, pkcs8_der: &[u8], data: &[u8]) -> Result<Vec<u8>, ProviderError> {
                use pqcrypto_mldsa::$module;

                let secret_key = self.secret_key(pkcs8_der)?;
                let signature = $module::detached_sign(data, &secret_key);
                Ok(signature.as_bytes().to_vec())
            }

            fn verify(
                &self,
                public_key: &[u8],
                data: &[u8],
                signature: &[u8],
            ) -> Result<bool, ProviderError> {
                use pqcrypto_mldsa::$module;

                let public_key = $module::PublicKey::from_bytes(public_key)
                    .map_err(|e| invalid_key($algorithm, e))?;
                let Ok(signature) = $module::DetachedSignature::from_bytes(signature) else {
                    return Ok(false);
                };

                Ok($module::verify_detached_signature(&signature, data, &public_key).is_ok())
            }
        }
    };
}

mldsa_backend!(MlDsa44Backend, mldsa44, SignatureAlgorithm::MlDsa44);
mldsa_backend!(MlDsa65Backend, mldsa65, SignatureAlgorithm::MlDsa65);
mldsa_backend!(MlDsa87Backend, mldsa87, SignatureAlgorithm::MlDsa87);

pub struct Ed25519Backend;

impl SignatureBackend for Ed25519Backend {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ed25519
    }

    fn generate(&self) -> Result<GeneratedKeyPair, ProviderError> {
        let mut seed = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut seed[..]);
        let signing_key = SigningKey::from_bytes(&seed);

        let document = signing_key
            .to_pkcs8_der()
            .map_err(|e| invalid_key(SignatureAlgorithm::Ed25519, e))?;

        Ok(GeneratedKeyPair {
            algorithm: SignatureAlgorithm::Ed25519,
            pkcs8_der: Zeroizing::new(document.as_bytes().to_vec()),
            public_key: signing_key.verifying_key().to_bytes().to_vec(),
        })
    }

    fn check_key(&self, pkcs8_der: &[u8]) -> Result<(), ProviderError> {
        SigningKey::from_pkcs8_der(pkcs8_der)
            .map(|_| ())
            .map_err(|e| invalid_key(SignatureAlgorithm::Ed25519, e))
    }

    fn sign(&self, pkcs8_der: &[u8], data: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let signing_key = SigningKey::from_pkcs8_der(pkcs8_der)
            .map_err(|e| invalid_key(SignatureAlgorithm::Ed25519, e))?;
        Ok(signing_key.sign(data).to_bytes().to_vec())
    }

    fn verify(&self, public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<bool, ProviderError> {
        let key_bytes: [u8; 32] = public_key.try_into().map_err(|_| {
            invalid_key(
                SignatureAlgorithm::Ed25519,
                format!("public key must be 32 bytes, got {}", public_key.len()),
            )
        })?;
        let verifying_key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| invalid_key(SignatureAlgorithm::Ed25519, e))?;

        let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
            return Ok(false);
        };

        Ok(verifying_key.verify(data, &signature).is_ok())
    }
}
