pub mod biometric;
pub mod crypto_impl;
pub mod keyring;
pub mod logging;
pub mod secret_wrapper;
pub mod signature_provider;
pub mod storage;
#[cfg(target_os = "macos")]
mod swift_runner;

pub use biometric::{get_biometric_auth, BiometricAuth, BiometricOutcome, BiometricRequest};
pub use crypto_impl::CryptoServiceImpl;
pub use keyring::{HardwareKeyStore, KeyringHardwareKey};
pub use logging::init_logging;
pub use secret_wrapper::{SecretWrapper, WrappedSecretStore};
pub use signature_provider::SignatureRegistry;
pub use storage::ContainerStorage;
