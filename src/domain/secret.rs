use std::fmt;

use zeroize::{Zeroize, Zeroizing};

/// A secret encrypted under the biometric-gated key. Both halves are
/// persisted; a record missing either one counts as no secret at all.
#[derive(Clone, PartialEq, Eq)]
pub struct WrappedSecret {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
}

impl fmt::Debug for WrappedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedSecret")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("nonce_len", &self.nonce.len())
            .finish()
    }
}

/// Container password held for the lifetime of a session.
#[derive(Clone)]
pub struct SessionPassword(Zeroizing<String>);

impl SessionPassword {
    pub fn new(password: String) -> Self {
        Self(Zeroizing::new(password))
    }

    /// Takes ownership of decrypted bytes; they are wiped whether or not
    /// they turn out to be valid UTF-8.
    pub fn from_utf8(bytes: Zeroizing<Vec<u8>>) -> Option<Self> {
        std::str::from_utf8(&bytes)
            .ok()
            .map(|s| Self::new(s.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn wipe(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SessionPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionPassword(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wipe_clears_contents() {
        let mut password = SessionPassword::new("pw1".to_string());
        password.wipe();
        assert!(password.is_empty());
    }

    #[test]
    fn test_from_utf8_rejects_invalid_bytes() {
        assert!(SessionPassword::from_utf8(Zeroizing::new(vec![0xff, 0xfe])).is_none());
        let password = SessionPassword::from_utf8(Zeroizing::new(b"pw1".to_vec())).unwrap();
        assert_eq!(password.expose(), "pw1");
    }

    #[test]
    fn test_debug_is_redacted() {
        let password = SessionPassword::new("hunter2".to_string());
        assert!(!format!("{:?}", password).contains("hunter2"));
    }
}
