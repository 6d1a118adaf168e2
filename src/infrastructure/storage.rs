use crate::domain::{
    Certificate, Container, ContainerEntry, ContainerError, CryptoError, CryptoService,
    PrivateKeyMaterial,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

const SALT_LEN: usize = 16;
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct ContainerDocument {
    version: u32,
    entries: BTreeMap<String, StoredEntry>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StoredEntry {
    PrivateKey {
        key: StoredKey,
        chain: Vec<String>,
        created_at: DateTime<Utc>,
    },
    TrustedCertificate {
        certificate: String,
        created_at: DateTime<Utc>,
    },
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct StoredKey {
    algorithm: String,
    pkcs8: String,
}

/// Reads and writes the credential container file:
/// `salt(16) || nonce(12) || AES-256-GCM(JSON)` under an Argon2id key.
pub struct ContainerStorage<C: CryptoService> {
    crypto: C,
    path: PathBuf,
    recreate_on_load_failure: bool,
}

impl<C: CryptoService> ContainerStorage<C> {
    pub fn new(crypto: C, path: impl Into<PathBuf>) -> Self {
        Self {
            crypto,
            path: path.into(),
            recreate_on_load_failure: false,
        }
    }

    /// Restores the legacy behaviour of treating any unreadable container
    /// as empty. The next persist then overwrites the old file.
    pub fn recreate_on_load_failure(mut self, enabled: bool) -> Self {
        self.recreate_on_load_failure = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn open_or_create(&self, password: &str) -> Result<Container, ContainerError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no container file yet, starting empty");
            return Ok(Container::new());
        }

        match self.load(password) {
            Ok(container) => Ok(container),
            Err(e) if self.recreate_on_load_failure => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "container could not be loaded, continuing with an empty one"
                );
                Ok(Container::new())
            }
            Err(e) => Err(e),
        }
    }

    pub fn persist(&self, container: &Container, password: &str) -> Result<(), ContainerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ContainerError::Write(format!("Failed to create container directory: {}", e))
            })?;
        }

        let document = ContainerDocument {
            version: FORMAT_VERSION,
            entries: container
                .entries()
                .map(|(alias, entry)| (alias.to_string(), to_stored(entry)))
                .collect(),
        };
        let json_data = Zeroizing::new(serde_json::to_vec(&document).map_err(|e| {
            ContainerError::Encoding(format!("Failed to serialize container: {}", e))
        })?);

        let mut salt = [0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);

        let derived_key = self.crypto.derive_key(password, &salt).map_err(write_error)?;
        let ciphertext = self
            .crypto
            .encrypt_with_key(&json_data, &derived_key)
            .map_err(write_error)?;

        let mut encrypted_data = Vec::with_capacity(SALT_LEN + ciphertext.len());
        encrypted_data.extend_from_slice(&salt);
        encrypted_data.extend_from_slice(&ciphertext);

        self.write_container_file(&encrypted_data)?;
        debug!(
            path = %self.path.display(),
            entries = container.len(),
            "container persisted"
        );
        Ok(())
    }

    fn load(&self, password: &str) -> Result<Container, ContainerError> {
        let encrypted_data = fs::read(&self.path).map_err(|e| {
            ContainerError::Read(format!("Failed to read container file: {}", e))
        })?;

        if encrypted_data.len() < SALT_LEN {
            return Err(ContainerError::WrongPasswordOrCorrupt);
        }

        let (salt, ciphertext) = encrypted_data.split_at(SALT_LEN);
        let derived_key = self
            .crypto
            .derive_key(password, salt)
            .map_err(|e| ContainerError::Read(e.to_string()))?;

        let plaintext = self
            .crypto
            .decrypt_with_key(ciphertext, &derived_key)
            .map_err(|_| ContainerError::WrongPasswordOrCorrupt)?;

        let document: ContainerDocument =
            serde_json::from_slice(&plaintext).map_err(|_| ContainerError::WrongPasswordOrCorrupt)?;

        if document.version != FORMAT_VERSION {
            return Err(ContainerError::Encoding(format!(
                "Unsupported container version {}",
                document.version
            )));
        }

        let entries = document
            .entries
            .iter()
            .map(|(alias, stored)| Ok((alias.clone(), from_stored(stored)?)))
            .collect::<Result<BTreeMap<_, _>, ContainerError>>()?;

        Ok(Container::from_entries(entries))
    }

    fn write_container_file(&self, encrypted_data: &[u8]) -> Result<(), ContainerError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| ContainerError::Write(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(encrypted_data)
            .map_err(|e| ContainerError::Write(format!("Failed to write container file: {}", e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| ContainerError::Write(format!("Failed to sync container file: {}", e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o600)).map_err(|e| {
                ContainerError::Write(format!("Failed to set file permissions: {}", e))
            })?;
        }

        temp.persist(&self.path).map_err(|e| {
            ContainerError::Write(format!("Failed to finalize container file: {}", e))
        })?;

        Ok(())
    }
}

fn write_error(e: CryptoError) -> ContainerError {
    ContainerError::Write(e.to_string())
}

fn to_stored(entry: &ContainerEntry) -> StoredEntry {
    match entry {
        ContainerEntry::PrivateKey {
            private_key,
            chain,
            created_at,
        } => StoredEntry::PrivateKey {
            key: StoredKey {
                algorithm: private_key.algorithm().to_string(),
                pkcs8: BASE64.encode(private_key.pkcs8_der()),
            },
            chain: chain.iter().map(|cert| BASE64.encode(cert.der())).collect(),
            created_at: *created_at,
        },
        ContainerEntry::TrustedCertificate {
            certificate,
            created_at,
        } => StoredEntry::TrustedCertificate {
            certificate: BASE64.encode(certificate.der()),
            created_at: *created_at,
        },
    }
}

fn from_stored(stored: &StoredEntry) -> Result<ContainerEntry, ContainerError> {
    match stored {
        StoredEntry::PrivateKey {
            key,
            chain,
            created_at,
        } => {
            let pkcs8 = Zeroizing::new(
                BASE64
                    .decode(&key.pkcs8)
                    .map_err(|e| ContainerError::Encoding(format!("Corrupt key entry: {}", e)))?,
            );
            let chain = chain
                .iter()
                .map(|encoded| decode_certificate(encoded))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ContainerEntry::PrivateKey {
                private_key: PrivateKeyMaterial::new(key.algorithm.clone(), pkcs8),
                chain,
                created_at: *created_at,
            })
        }
        StoredEntry::TrustedCertificate {
            certificate,
            created_at,
        } => Ok(ContainerEntry::TrustedCertificate {
            certificate: decode_certificate(certificate)?,
            created_at: *created_at,
        }),
    }
}

fn decode_certificate(encoded: &str) -> Result<Certificate, ContainerError> {
    let der = BASE64
        .decode(encoded)
        .map_err(|e| ContainerError::Encoding(format!("Corrupt certificate entry: {}", e)))?;
    Certificate::from_der(der).map_err(|e| ContainerError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pem_object;
    use crate::infrastructure::CryptoServiceImpl;
    use crate::test_support::{CertSpec, TestPki};
    use tempfile::TempDir;

    fn storage(dir: &TempDir) -> ContainerStorage<CryptoServiceImpl> {
        ContainerStorage::new(CryptoServiceImpl::new(), dir.path().join("store.pcs"))
    }

    fn sample_container(pki: &TestPki) -> Container {
        let leaf = pki.leaf(CertSpec::default());
        let key = pem_object::parse_private_key(leaf.key_pem.as_bytes()).unwrap();
        let mut container = Container::new();
        container
            .put_credential("client-1", key, vec![leaf.certificate(), pki.ca_certificate()])
            .unwrap();
        container
            .put_trusted_certificate("root", pki.ca_certificate())
            .unwrap();
        container
    }

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let container = storage(&dir).open_or_create("pw1").unwrap();
        assert!(container.is_empty());
    }

    #[test]
    fn test_persist_then_reopen() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let pki = TestPki::new();
        let container = sample_container(&pki);

        storage.persist(&container, "pw1").unwrap();
        let reopened = storage.open_or_create("pw1").unwrap();

        assert_eq!(reopened.list_aliases(), vec!["client-1", "root"]);
        let original = container.get_credential("client-1").unwrap();
        let credential = reopened.get_credential("client-1").unwrap();
        assert_eq!(credential.chain, original.chain);
        assert_eq!(
            credential.private_key.pkcs8_der(),
            original.private_key.pkcs8_der()
        );
        assert_eq!(credential.private_key.algorithm(), "Ed25519");
    }

    #[test]
    fn test_wrong_password_is_surfaced() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let pki = TestPki::new();
        storage.persist(&sample_container(&pki), "pw1").unwrap();

        assert!(matches!(
            storage.open_or_create("wrong"),
            Err(ContainerError::WrongPasswordOrCorrupt)
        ));
    }

    #[test]
    fn test_lenient_mode_recreates_on_failure() {
        let dir = TempDir::new().unwrap();
        let pki = TestPki::new();
        storage(&dir).persist(&sample_container(&pki), "pw1").unwrap();

        let lenient = storage(&dir).recreate_on_load_failure(true);
        assert!(lenient.open_or_create("wrong").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_surfaced() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        fs::write(storage.path(), b"garbage").unwrap();

        assert!(matches!(
            storage.open_or_create("pw1"),
            Err(ContainerError::WrongPasswordOrCorrupt)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_container_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        storage.persist(&Container::new(), "pw1").unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
