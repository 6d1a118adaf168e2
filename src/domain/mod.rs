pub mod certificate;
pub mod container;
pub mod crypto;
pub mod error;
pub mod pem_object;
pub mod policy;
pub mod secret;
pub mod signature;
pub mod verify_flow;

pub use certificate::{Certificate, CertificateSummary, EntryKind};
pub use container::{Container, ContainerEntry, Credential};
pub use crypto::CryptoService;
pub use error::{
    AliasError, BiometricError, ContainerError, CredentialError, CryptoError, PemError,
    ProviderError,
};
pub use pem_object::PemObject;
pub use policy::ValidationReport;
pub use secret::{SessionPassword, WrappedSecret};
pub use signature::{GeneratedKeyPair, PrivateKeyMaterial, SignatureAlgorithm, SignatureProvider};
pub use verify_flow::{VerificationFlow, VerifyOutcome, VerifyStage};
