use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::certificate::{Certificate, EntryKind};
use super::error::{AliasError, ContainerError};
use super::signature::PrivateKeyMaterial;

const ALIAS_PATTERN: &str = r"^[A-Za-z0-9._-]{1,64}$";

/// A private key with its certificate chain, subject certificate first.
#[derive(Debug, Clone)]
pub struct Credential {
    pub alias: String,
    pub private_key: PrivateKeyMaterial,
    pub chain: Vec<Certificate>,
}

impl Credential {
    pub fn certificate(&self) -> Option<&Certificate> {
        self.chain.first()
    }
}

#[derive(Debug, Clone)]
pub enum ContainerEntry {
    PrivateKey {
        private_key: PrivateKeyMaterial,
        chain: Vec<Certificate>,
        created_at: DateTime<Utc>,
    },
    TrustedCertificate {
        certificate: Certificate,
        created_at: DateTime<Utc>,
    },
}

impl ContainerEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            ContainerEntry::PrivateKey { .. } => EntryKind::PrivateKey,
            ContainerEntry::TrustedCertificate { .. } => EntryKind::TrustedCertificate,
        }
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            ContainerEntry::PrivateKey { chain, .. } => chain.first(),
            ContainerEntry::TrustedCertificate { certificate, .. } => Some(certificate),
        }
    }
}

/// In-memory view of the password-protected credential container.
#[derive(Debug, Clone, Default)]
pub struct Container {
    entries: BTreeMap<String, ContainerEntry>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: BTreeMap<String, ContainerEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ContainerEntry)> {
        self.entries.iter().map(|(alias, entry)| (alias.as_str(), entry))
    }

    pub fn list_aliases(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get_credential(&self, alias: &str) -> Result<Credential, AliasError> {
        match self.entries.get(alias) {
            None => Err(AliasError::AliasNotFound(alias.to_string())),
            Some(ContainerEntry::TrustedCertificate { .. }) => {
                Err(AliasError::NotAPrivateKeyEntry(alias.to_string()))
            }
            Some(ContainerEntry::PrivateKey {
                private_key, chain, ..
            }) => Ok(Credential {
                alias: alias.to_string(),
                private_key: private_key.clone(),
                chain: chain.clone(),
            }),
        }
    }

    /// Inserts or replaces `alias`. Returns whether an entry was replaced.
    pub fn put_credential(
        &mut self,
        alias: &str,
        private_key: PrivateKeyMaterial,
        chain: Vec<Certificate>,
    ) -> Result<bool, ContainerError> {
        validate_alias(alias)?;
        let entry = ContainerEntry::PrivateKey {
            private_key,
            chain,
            created_at: Utc::now(),
        };
        Ok(self.entries.insert(alias.to_string(), entry).is_some())
    }

    pub fn put_trusted_certificate(
        &mut self,
        alias: &str,
        certificate: Certificate,
    ) -> Result<bool, ContainerError> {
        validate_alias(alias)?;
        let entry = ContainerEntry::TrustedCertificate {
            certificate,
            created_at: Utc::now(),
        };
        Ok(self.entries.insert(alias.to_string(), entry).is_some())
    }

    pub fn remove(&mut self, alias: &str) -> Result<ContainerEntry, AliasError> {
        self.entries
            .remove(alias)
            .ok_or_else(|| AliasError::AliasNotFound(alias.to_string()))
    }
}

pub fn validate_alias(alias: &str) -> Result<(), ContainerError> {
    let re = Regex::new(ALIAS_PATTERN).map_err(|e| ContainerError::Encoding(e.to_string()))?;
    if re.is_match(alias) {
        Ok(())
    } else {
        Err(ContainerError::InvalidAlias(alias.to_string()))
    }
}
