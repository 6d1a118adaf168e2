use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::biometric::{authenticate_with_timeout, BiometricAuth, BiometricOutcome};
use super::crypto_impl::{open, seal};
use super::keyring::HardwareKeyStore;
use crate::access_coordinator::PasswordGate;
use crate::domain::{BiometricError, SessionPassword, WrappedSecret};

const UNWRAP_REASON: &str = "Unlock your certificate store";
const WRAP_REASON: &str = "Enable fingerprint unlock for your certificate store";

#[derive(Default, Serialize, Deserialize)]
struct WrappedSecretRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ciphertext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
}

/// JSON key-value file holding the wrapped password. Only ciphertext and
/// nonce are ever written.
pub struct WrappedSecretStore {
    path: PathBuf,
}

impl WrappedSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<WrappedSecret>, BiometricError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| BiometricError::Storage(format!("Failed to read record: {}", e)))?;
        let record: WrappedSecretRecord = serde_json::from_str(&content)
            .map_err(|e| BiometricError::Storage(format!("Failed to parse record: {}", e)))?;

        let (Some(ciphertext), Some(nonce)) = (record.ciphertext, record.nonce) else {
            return Ok(None);
        };

        let decode = |value: &str| {
            BASE64
                .decode(value)
                .map_err(|e| BiometricError::Storage(format!("Corrupt record: {}", e)))
        };

        Ok(Some(WrappedSecret {
            ciphertext: decode(&ciphertext)?,
            nonce: decode(&nonce)?,
        }))
    }

    pub fn save(&self, wrapped: &WrappedSecret) -> Result<(), BiometricError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BiometricError::Storage(format!("Failed to create directory: {}", e)))?;
        }

        let record = WrappedSecretRecord {
            ciphertext: Some(BASE64.encode(&wrapped.ciphertext)),
            nonce: Some(BASE64.encode(&wrapped.nonce)),
        };
        let content = serde_json::to_string_pretty(&record)
            .map_err(|e| BiometricError::Storage(e.to_string()))?;

        fs::write(&self.path, content)
            .map_err(|e| BiometricError::Storage(format!("Failed to write record: {}", e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|e| BiometricError::Storage(format!("Failed to set permissions: {}", e)))?;
        }

        Ok(())
    }

    pub fn clear(&self) -> Result<(), BiometricError> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| BiometricError::Storage(format!("Failed to remove record: {}", e)))?;
        }
        Ok(())
    }
}

/// Wraps the container password under a key that is only released after a
/// biometric check. Both wrapping and unwrapping prompt.
pub struct SecretWrapper<K: HardwareKeyStore> {
    keys: K,
    auth: Arc<dyn BiometricAuth>,
    store: WrappedSecretStore,
    timeout: Duration,
}

impl<K: HardwareKeyStore> SecretWrapper<K> {
    pub fn new(
        keys: K,
        auth: Arc<dyn BiometricAuth>,
        store: WrappedSecretStore,
        timeout: Duration,
    ) -> Self {
        Self {
            keys,
            auth,
            store,
            timeout,
        }
    }

    pub fn is_available(&self) -> bool {
        self.auth.is_available()
    }

    pub fn has_wrapped_secret(&self) -> bool {
        matches!(self.store.load(), Ok(Some(_)))
    }

    pub fn ensure_key(&self) -> Result<(), BiometricError> {
        if !self.keys.has_key()? {
            self.keys.create_key()?;
        }
        Ok(())
    }

    pub fn wrap(&self, secret: &[u8]) -> Result<WrappedSecret, BiometricError> {
        self.require_biometric(WRAP_REASON)?;
        self.ensure_key()?;

        let key = self.keys.load_key()?;
        let (nonce, ciphertext) =
            seal(&key, secret).map_err(|e| BiometricError::Storage(e.to_string()))?;

        Ok(WrappedSecret {
            ciphertext,
            nonce: nonce.to_vec(),
        })
    }

    /// Fails with `NoBiometricKey` when the key is missing, which is only
    /// discovered after the biometric check.
    pub fn unwrap(&self, wrapped: &WrappedSecret) -> Result<Zeroizing<Vec<u8>>, BiometricError> {
        self.require_biometric(UNWRAP_REASON)?;

        let key = self.keys.load_key()?;
        open(&key, &wrapped.nonce, &wrapped.ciphertext).map_err(|_| BiometricError::DecryptionFailed)
    }

    pub fn stored(&self) -> Result<Option<WrappedSecret>, BiometricError> {
        self.store.load()
    }

    pub fn store(&self, wrapped: &WrappedSecret) -> Result<(), BiometricError> {
        self.store.save(wrapped)?;
        debug!(path = %self.store.path().display(), "wrapped secret stored");
        Ok(())
    }

    /// Forgets the wrapped password and the key that wrapped it.
    pub fn clear(&self) -> Result<(), BiometricError> {
        self.store.clear()?;
        self.keys.delete_key()?;
        info!("biometric unlock disabled");
        Ok(())
    }

    fn require_biometric(&self, reason: &str) -> Result<(), BiometricError> {
        if !self.auth.is_available() {
            return Err(BiometricError::BiometricUnavailable(
                "no biometric sensor is available".to_string(),
            ));
        }

        match authenticate_with_timeout(Arc::clone(&self.auth), reason, self.timeout) {
            BiometricOutcome::Success => Ok(()),
            BiometricOutcome::Cancelled => Err(BiometricError::BiometricCancelled),
            BiometricOutcome::Error(reason) => Err(BiometricError::BiometricUnavailable(reason)),
        }
    }
}

impl<K: HardwareKeyStore> PasswordGate for SecretWrapper<K> {
    fn has_wrapped_secret(&self) -> bool {
        SecretWrapper::has_wrapped_secret(self)
    }

    fn biometric_available(&self) -> bool {
        self.is_available()
    }

    fn unwrap_password(&self) -> Result<SessionPassword, BiometricError> {
        let wrapped = self.stored()?.ok_or(BiometricError::NoWrappedSecret)?;
        let plaintext = self.unwrap(&wrapped)?;
        SessionPassword::from_utf8(plaintext).ok_or(BiometricError::DecryptionFailed)
    }

    fn wrap_password(&self, password: &SessionPassword) -> Result<(), BiometricError> {
        let wrapped = self.wrap(password.expose().as_bytes())?;
        self.store(&wrapped)
    }
}
