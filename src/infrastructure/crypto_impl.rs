use crate::domain::{CryptoError, CryptoService};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::Zeroizing;

pub const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const MIN_ENCRYPTED_LEN_WITH_KEY: usize = NONCE_LEN + TAG_LEN;

pub struct CryptoServiceImpl;

impl CryptoServiceImpl {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoService for CryptoServiceImpl {
    fn derive_key(&self, password: &str, salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
        let mut output_key = Zeroizing::new([0u8; 32]);

        let params = Params::new(19 * 1024, 2, 1, Some(32))
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        argon2
            .hash_password_into(password.as_bytes(), salt, &mut output_key[..])
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

        Ok(output_key)
    }

    fn encrypt_with_key(
        &self,
        data: &[u8],
        derived_key: &[u8; 32],
    ) -> Result<Vec<u8>, CryptoError> {
        let (nonce_bytes, ciphertext) = seal(derived_key, data)?;

        let mut result = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    fn decrypt_with_key(
        &self,
        encrypted_data: &[u8],
        derived_key: &[u8; 32],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if encrypted_data.len() < MIN_ENCRYPTED_LEN_WITH_KEY {
            return Err(CryptoError::InvalidData("too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = encrypted_data.split_at(NONCE_LEN);
        open(derived_key, nonce_bytes, ciphertext)
    }
}

impl Default for CryptoServiceImpl {
    fn default() -> Self {
        Self::new()
    }
}

/// AES-256-GCM with a fresh random nonce per call. Returns `(nonce, ciphertext)`.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<([u8; NONCE_LEN], Vec<u8>), CryptoError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CryptoError::CipherInitFailed(e.to_string()))?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok((nonce_bytes, ciphertext))
}

pub fn open(
    key: &[u8; 32],
    nonce: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::InvalidData(format!(
            "nonce must be {} bytes, got {}",
            NONCE_LEN,
            nonce.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CryptoError::CipherInitFailed(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_with_derived_key() {
        let crypto = CryptoServiceImpl::new();
        let key = crypto.derive_key("pw1", &[7u8; 16]).unwrap();

        let encrypted = crypto.encrypt_with_key(b"container body", &key).unwrap();
        let decrypted = crypto.decrypt_with_key(&encrypted, &key).unwrap();

        assert_eq!(decrypted.as_slice(), b"container body");
    }

    #[test]
    fn test_wrong_password_fails() {
        let crypto = CryptoServiceImpl::new();
        let key = crypto.derive_key("pw1", &[7u8; 16]).unwrap();
        let other = crypto.derive_key("pw2", &[7u8; 16]).unwrap();

        let encrypted = crypto.encrypt_with_key(b"secret", &key).unwrap();

        assert!(matches!(
            crypto.decrypt_with_key(&encrypted, &other),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_seal_uses_fresh_nonces() {
        let key = [1u8; 32];
        let (first, _) = seal(&key, b"same").unwrap();
        let (second, _) = seal(&key, b"same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_truncated_data_rejected() {
        let crypto = CryptoServiceImpl::new();
        let key = [0u8; 32];
        assert!(matches!(
            crypto.decrypt_with_key(&[0u8; 10], &key),
            Err(CryptoError::InvalidData(_))
        ));
    }
}
