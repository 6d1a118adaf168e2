use zeroize::Zeroizing;

use super::error::CryptoError;

pub trait CryptoService {
    fn derive_key(&self, password: &str, salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, CryptoError>;
    fn encrypt_with_key(&self, data: &[u8], derived_key: &[u8; 32]) -> Result<Vec<u8>, CryptoError>;
    fn decrypt_with_key(&self, encrypted_data: &[u8], derived_key: &[u8; 32]) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}
