use thiserror::Error;

use super::policy::ValidationReport;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PemError {
    #[error("PEM data is empty or contains no decodable object")]
    EmptyOrMalformed,

    #[error("PEM object is not an X.509 certificate (found '{0}')")]
    NotACertificate(String),

    #[error("Encrypted private keys are not supported; export the key without a passphrase")]
    UnsupportedEncryptedKey,

    #[error("Unsupported PEM object kind: {0}")]
    UnsupportedPemObjectKind(String),

    #[error("Invalid private key structure: {0}")]
    InvalidPrivateKey(String),
}

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: incorrect password or corrupted data")]
    DecryptionFailed,

    #[error("Cipher initialization failed: {0}")]
    CipherInitFailed(String),

    #[error("Invalid encrypted data: {0}")]
    InvalidData(String),
}

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Credential container could not be opened: wrong password or corrupted file")]
    WrongPasswordOrCorrupt,

    #[error("Failed to read credential container: {0}")]
    Read(String),

    #[error("Failed to write credential container: {0}")]
    Write(String),

    #[error("Invalid alias '{0}': use 1-64 characters from [A-Za-z0-9._-]")]
    InvalidAlias(String),

    #[error("Container encoding error: {0}")]
    Encoding(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AliasError {
    #[error("Alias '{0}' not found")]
    AliasNotFound(String),

    #[error("Alias '{0}' has no private key associated")]
    NotAPrivateKeyEntry(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid key material for {algorithm}: {reason}")]
    InvalidKey { algorithm: String, reason: String },

    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BiometricError {
    #[error("No biometric key is available on this device")]
    NoBiometricKey,

    #[error("Biometric authentication is unavailable: {0}")]
    BiometricUnavailable(String),

    #[error("Biometric authentication was cancelled")]
    BiometricCancelled,

    #[error("Failed to decrypt the stored password")]
    DecryptionFailed,

    #[error("No password is stored for biometric unlock")]
    NoWrappedSecret,

    #[error("Biometric storage error: {0}")]
    Storage(String),
}

impl BiometricError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, BiometricError::BiometricCancelled)
    }
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error(transparent)]
    Parse(#[from] PemError),

    #[error("Certificate is not suitable for electronic signatures.\nReason:\n{}", .0.diagnostics_text())]
    CertificateRejected(Box<ValidationReport>),

    #[error("Private key algorithm {key} does not match certificate algorithm {certificate}")]
    KeyCertificateMismatch { key: String, certificate: String },

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Alias(#[from] AliasError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
