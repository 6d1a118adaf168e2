use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use keyring::Entry;
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::BiometricError;

const SERVICE_NAME: &str = "pqc-certstore";
const ACCOUNT: &str = "container-password-key";

/// Holder of the 32-byte key that wraps the container password. Reading the
/// key is only done after a successful biometric check.
pub trait HardwareKeyStore {
    fn has_key(&self) -> Result<bool, BiometricError>;
    fn create_key(&self) -> Result<(), BiometricError>;
    fn load_key(&self) -> Result<Zeroizing<[u8; 32]>, BiometricError>;
    fn delete_key(&self) -> Result<(), BiometricError>;
}

pub struct KeyringHardwareKey {
    service: String,
    account: String,
}

impl KeyringHardwareKey {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            account: ACCOUNT.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, BiometricError> {
        Entry::new(&self.service, &self.account)
            .map_err(|e| BiometricError::Storage(format!("OS keyring unavailable: {}", e)))
    }
}

impl Default for KeyringHardwareKey {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareKeyStore for KeyringHardwareKey {
    fn has_key(&self) -> Result<bool, BiometricError> {
        match self.entry()?.get_password().map(Zeroizing::new) {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(BiometricError::Storage(e.to_string())),
        }
    }

    fn create_key(&self) -> Result<(), BiometricError> {
        let mut key = Zeroizing::new([0u8; 32]);
        rand::rngs::OsRng.fill_bytes(&mut key[..]);
        let encoded = Zeroizing::new(BASE64.encode(&key[..]));

        self.entry()?
            .set_password(&encoded)
            .map_err(|e| BiometricError::Storage(format!("Failed to store key: {}", e)))?;
        debug!(service = %self.service, "wrapping key created");
        Ok(())
    }

    fn load_key(&self) -> Result<Zeroizing<[u8; 32]>, BiometricError> {
        let encoded = match self.entry()?.get_password() {
            Ok(value) => Zeroizing::new(value),
            Err(keyring::Error::NoEntry) => return Err(BiometricError::NoBiometricKey),
            Err(e) => return Err(BiometricError::Storage(e.to_string())),
        };

        let decoded = Zeroizing::new(
            BASE64
                .decode(encoded.trim())
                .map_err(|_| BiometricError::NoBiometricKey)?,
        );
        if decoded.len() != 32 {
            return Err(BiometricError::NoBiometricKey);
        }

        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&decoded);
        Ok(key)
    }

    fn delete_key(&self) -> Result<(), BiometricError> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(BiometricError::Storage(e.to_string())),
        }
    }
}
