use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::policy::{self, ValidationReport};
use crate::domain::{
    pem_object, Certificate, CertificateSummary, ContainerError, Credential, CredentialError,
    CryptoService, SignatureAlgorithm, SignatureProvider, VerifyOutcome,
};
use crate::infrastructure::ContainerStorage;

/// Import, listing, signing and verification over one credential container.
pub struct CredentialManager<C: CryptoService, P: SignatureProvider> {
    storage: ContainerStorage<C>,
    provider: P,
}

impl<C: CryptoService, P: SignatureProvider> CredentialManager<C, P> {
    pub fn new(storage: ContainerStorage<C>, provider: P) -> Self {
        Self { storage, provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn container_exists(&self) -> bool {
        self.storage.exists()
    }

    /// Parses the three PEM inputs, runs the signing policy with the CA and
    /// stores `[subject, ca]` under `alias` when the subject is acceptable.
    pub fn import_credential(
        &self,
        subject_pem: &[u8],
        key_pem: &[u8],
        ca_pem: &[u8],
        alias: &str,
        password: &str,
    ) -> Result<ValidationReport, CredentialError> {
        let subject = pem_object::parse_certificate(subject_pem)?;
        let private_key = pem_object::parse_private_key(key_pem)?;
        let ca = pem_object::parse_certificate(ca_pem)?;

        let report = policy::evaluate(&subject, Some(&ca), &self.provider);
        if !report.acceptable_for_signing() {
            warn!(alias, "certificate rejected on import");
            return Err(CredentialError::CertificateRejected(Box::new(report)));
        }

        let certificate_algorithm = certificate_key_algorithm(&subject);
        if !same_algorithm(private_key.algorithm(), &certificate_algorithm) {
            return Err(CredentialError::KeyCertificateMismatch {
                key: private_key.algorithm().to_string(),
                certificate: certificate_algorithm,
            });
        }
        self.provider
            .check_private_key(private_key.algorithm(), &private_key)?;

        let mut container = self.storage.open_or_create(password)?;
        let replaced = container.put_credential(alias, private_key, vec![subject, ca])?;
        self.storage.persist(&container, password)?;

        info!(alias, replaced, algorithm = %report.algorithm, "credential imported");
        Ok(report)
    }

    /// Stores a certificate without a key, e.g. a counterpart's signing
    /// certificate kept for later verification.
    pub fn import_trusted_certificate(
        &self,
        cert_pem: &[u8],
        alias: &str,
        password: &str,
    ) -> Result<Certificate, CredentialError> {
        let certificate = pem_object::parse_certificate(cert_pem)?;

        let mut container = self.storage.open_or_create(password)?;
        container.put_trusted_certificate(alias, certificate.clone())?;
        self.storage.persist(&container, password)?;

        info!(alias, "trusted certificate imported");
        Ok(certificate)
    }

    pub fn list_certificates(&self, password: &str) -> Result<Vec<CertificateSummary>, CredentialError> {
        let container = self.storage.open_or_create(password)?;
        let now = Utc::now();

        Ok(container
            .entries()
            .filter_map(|(alias, entry)| {
                entry
                    .certificate()
                    .map(|cert| CertificateSummary::new(alias, entry.kind(), cert, now))
            })
            .collect())
    }

    pub fn get_credential(&self, alias: &str, password: &str) -> Result<Credential, CredentialError> {
        let container = self.storage.open_or_create(password)?;
        Ok(container.get_credential(alias)?)
    }

    pub fn remove_credential(&self, alias: &str, password: &str) -> Result<(), CredentialError> {
        let mut container = self.storage.open_or_create(password)?;
        container.remove(alias)?;
        self.storage.persist(&container, password)?;

        info!(alias, "entry removed");
        Ok(())
    }

    /// Signs with the algorithm the stored key declares.
    pub fn sign(&self, alias: &str, password: &str, data: &[u8]) -> Result<Vec<u8>, CredentialError> {
        let credential = self.get_credential(alias, password)?;
        let algorithm = credential.private_key.algorithm();
        debug!(alias, algorithm, "signing document");

        Ok(self.provider.sign(algorithm, &credential.private_key, data)?)
    }

    /// `Ok(false)` on a mismatch; `Err` when no backend handles the
    /// certificate's algorithm.
    pub fn verify(
        &self,
        certificate: &Certificate,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, CredentialError> {
        let algorithm = certificate_key_algorithm(certificate);
        debug!(algorithm = %algorithm, "verifying signature");

        Ok(self
            .provider
            .verify(&algorithm, certificate.public_key(), data, signature)?)
    }

    /// Signature check followed, for valid signatures, by the signing policy
    /// on the signer certificate.
    pub fn verify_document(
        &self,
        certificate: &Certificate,
        data: &[u8],
        signature: &[u8],
    ) -> Result<VerifyOutcome, CredentialError> {
        let signature_valid = self.verify(certificate, data, signature)?;
        let report = signature_valid.then(|| policy::evaluate(certificate, None, &self.provider));

        Ok(VerifyOutcome {
            signature_valid,
            report,
        })
    }

    pub fn validate(
        &self,
        subject_pem: &[u8],
        ca_pem: Option<&[u8]>,
    ) -> Result<ValidationReport, CredentialError> {
        let subject = pem_object::parse_certificate(subject_pem)?;
        let ca = ca_pem.map(pem_object::parse_certificate).transpose()?;
        Ok(policy::evaluate(&subject, ca.as_ref(), &self.provider))
    }

    /// Whether `password` opens the container. A missing container accepts
    /// any password; it is created with the first one used.
    pub fn check_password(&self, password: &str) -> Result<bool, CredentialError> {
        if !self.storage.exists() {
            return Ok(true);
        }

        match self.storage.open_or_create(password) {
            Ok(_) => Ok(true),
            Err(ContainerError::WrongPasswordOrCorrupt) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Public key algorithm name, falling back to the signature algorithm and
/// finally to the raw OID.
fn certificate_key_algorithm(certificate: &Certificate) -> String {
    certificate
        .public_key_algorithm()
        .or_else(|| certificate.signature_algorithm())
        .unwrap_or_else(|| certificate.public_key_oid())
        .to_string()
}

fn same_algorithm(key: &str, certificate: &str) -> bool {
    match (
        SignatureAlgorithm::from_name(key),
        SignatureAlgorithm::from_name(certificate),
    ) {
        (Some(a), Some(b)) => a == b,
        _ => key.eq_ignore_ascii_case(certificate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AliasError, EntryKind, PemError, ProviderError};
    use crate::infrastructure::{CryptoServiceImpl, SignatureRegistry};
    use crate::test_support::{ecdsa_leaf, mldsa44, CertSpec, TestPki};
    use rcgen::KeyUsagePurpose;
    use tempfile::TempDir;

    type Manager = CredentialManager<CryptoServiceImpl, SignatureRegistry>;

    fn manager(dir: &TempDir) -> Manager {
        let storage = ContainerStorage::new(CryptoServiceImpl::new(), dir.path().join("store.pcs"));
        CredentialManager::new(storage, SignatureRegistry::with_default_backends())
    }

    fn import_default(manager: &Manager, pki: &TestPki, alias: &str) -> Certificate {
        let leaf = pki.leaf(CertSpec::default());
        manager
            .import_credential(
                leaf.cert_pem.as_bytes(),
                leaf.key_pem.as_bytes(),
                pki.ca_pem().as_bytes(),
                alias,
                "pw1",
            )
            .unwrap();
        leaf.certificate()
    }

    #[test]
    fn test_import_sign_verify_scenario() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        let certificate = import_default(&manager, &pki, "client-1");

        let summaries = manager.list_certificates("pw1").unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].alias, "client-1");
        assert!(summaries[0].currently_valid);

        let signature = manager.sign("client-1", "pw1", b"hello world").unwrap();
        assert!(manager.verify(&certificate, b"hello world", &signature).unwrap());
        assert!(!manager.verify(&certificate, b"hello worlD", &signature).unwrap());
    }

    fn import_mldsa(manager: &Manager, key_pem: &str, alias: &str) -> ValidationReport {
        manager
            .import_credential(
                mldsa44::LEAF_PEM.as_bytes(),
                key_pem.as_bytes(),
                mldsa44::CA_PEM.as_bytes(),
                alias,
                "pw1",
            )
            .unwrap()
    }

    #[test]
    fn test_mldsa_import_sign_verify() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let certificate = pem_object::parse_certificate(mldsa44::LEAF_PEM.as_bytes()).unwrap();

        for (alias, key_pem) in [
            ("pqc-both", mldsa44::LEAF_KEY_BOTH_PEM),
            ("pqc-expanded", mldsa44::LEAF_KEY_EXPANDED_PEM),
        ] {
            let report = import_mldsa(&manager, key_pem, alias);
            assert_eq!(report.algorithm, "ML-DSA-44");
            assert!(report.is_pqc);
            assert!(report.ca_signature_checked);
            assert!(report.ca_signature_ok);

            let mut signature = manager.sign(alias, "pw1", b"hello world").unwrap();
            assert!(manager.verify(&certificate, b"hello world", &signature).unwrap());
            assert!(!manager.verify(&certificate, b"hello worlD", &signature).unwrap());

            signature[100] ^= 0x01;
            assert!(!manager.verify(&certificate, b"hello world", &signature).unwrap());
        }

        let summaries = manager.list_certificates("pw1").unwrap();
        let aliases: Vec<&str> = summaries.iter().map(|s| s.alias.as_str()).collect();
        assert_eq!(aliases, vec!["pqc-both", "pqc-expanded"]);
        assert!(summaries.iter().all(|s| s.algorithm == "ML-DSA-44"));
        assert!(summaries.iter().all(|s| s.currently_valid));
    }

    #[test]
    fn test_unloadable_key_is_refused_at_import() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);

        let err = manager
            .import_credential(
                mldsa44::LEAF_PEM.as_bytes(),
                mldsa44::LEAF_KEY_SEED_PEM.as_bytes(),
                mldsa44::CA_PEM.as_bytes(),
                "seed-only",
                "pw1",
            )
            .unwrap_err();

        assert!(matches!(
            err,
            CredentialError::Provider(ProviderError::InvalidKey { .. })
        ));
        assert!(!manager.container_exists());
    }

    #[test]
    fn test_import_stores_subject_and_ca_chain() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        let certificate = import_default(&manager, &pki, "client-1");

        let credential = manager.get_credential("client-1", "pw1").unwrap();
        assert_eq!(credential.chain, vec![certificate, pki.ca_certificate()]);
    }

    #[test]
    fn test_import_report_records_ca_linkage() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        let leaf = pki.leaf(CertSpec::default());

        let report = manager
            .import_credential(
                leaf.cert_pem.as_bytes(),
                leaf.key_pem.as_bytes(),
                pki.ca_pem().as_bytes(),
                "client-1",
                "pw1",
            )
            .unwrap();
        assert!(report.ca_signature_checked);
        assert!(report.ca_signature_ok);
    }

    #[test]
    fn test_expired_certificate_is_rejected() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        let leaf = pki.leaf(CertSpec {
            not_before: (2015, 1, 1),
            not_after: (2016, 1, 1),
            ..CertSpec::default()
        });

        let err = manager
            .import_credential(
                leaf.cert_pem.as_bytes(),
                leaf.key_pem.as_bytes(),
                pki.ca_pem().as_bytes(),
                "old",
                "pw1",
            )
            .unwrap_err();

        match err {
            CredentialError::CertificateRejected(report) => {
                assert!(!report.time_valid);
                assert!(report.diagnostics_text().contains("expired"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!manager.container_exists());
    }

    #[test]
    fn test_missing_key_usage_is_rejected() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        let leaf = pki.leaf(CertSpec {
            key_usages: vec![],
            ..CertSpec::default()
        });

        let err = manager
            .import_credential(
                leaf.cert_pem.as_bytes(),
                leaf.key_pem.as_bytes(),
                pki.ca_pem().as_bytes(),
                "no-ku",
                "pw1",
            )
            .unwrap_err();
        assert!(err.to_string().contains("not suitable for electronic signatures"));
    }

    #[test]
    fn test_ca_certificate_is_rejected() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        let leaf = pki.leaf(CertSpec {
            is_ca: true,
            key_usages: vec![KeyUsagePurpose::DigitalSignature, KeyUsagePurpose::KeyCertSign],
            ..CertSpec::default()
        });

        assert!(matches!(
            manager.import_credential(
                leaf.cert_pem.as_bytes(),
                leaf.key_pem.as_bytes(),
                pki.ca_pem().as_bytes(),
                "sub-ca",
                "pw1",
            ),
            Err(CredentialError::CertificateRejected(_))
        ));
    }

    #[test]
    fn test_key_for_other_algorithm_is_refused() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        let leaf = pki.leaf(CertSpec::default());

        let generated = manager.provider().generate_keypair("ML-DSA-44").unwrap();
        let key_pem = pem::encode(&pem::Pem::new("PRIVATE KEY", generated.pkcs8_der.to_vec()));

        assert!(matches!(
            manager.import_credential(
                leaf.cert_pem.as_bytes(),
                key_pem.as_bytes(),
                pki.ca_pem().as_bytes(),
                "client-1",
                "pw1",
            ),
            Err(CredentialError::KeyCertificateMismatch { .. })
        ));
    }

    #[test]
    fn test_certificate_in_key_slot_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        let leaf = pki.leaf(CertSpec::default());

        assert!(matches!(
            manager.import_credential(
                leaf.cert_pem.as_bytes(),
                leaf.cert_pem.as_bytes(),
                pki.ca_pem().as_bytes(),
                "client-1",
                "pw1",
            ),
            Err(CredentialError::Parse(PemError::UnsupportedPemObjectKind(_)))
        ));
    }

    #[test]
    fn test_reimport_replaces_alias() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        import_default(&manager, &pki, "client-1");
        let second = import_default(&manager, &pki, "client-1");

        let credential = manager.get_credential("client-1", "pw1").unwrap();
        assert_eq!(credential.certificate(), Some(&second));
        assert_eq!(manager.list_certificates("pw1").unwrap().len(), 1);
    }

    #[test]
    fn test_empty_container_lists_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(manager(&dir).list_certificates("pw1").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_alias_cannot_sign() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);

        assert!(matches!(
            manager.sign("missing", "pw1", b"data"),
            Err(CredentialError::Alias(AliasError::AliasNotFound(_)))
        ));
    }

    #[test]
    fn test_trusted_certificate_is_listed_but_cannot_sign() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        manager
            .import_trusted_certificate(pki.ca_pem().as_bytes(), "root", "pw1")
            .unwrap();

        let summaries = manager.list_certificates("pw1").unwrap();
        assert_eq!(summaries[0].kind, EntryKind::TrustedCertificate);
        assert!(matches!(
            manager.sign("root", "pw1", b"data"),
            Err(CredentialError::Alias(AliasError::NotAPrivateKeyEntry(_)))
        ));
    }

    #[test]
    fn test_remove_credential() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        import_default(&manager, &pki, "client-1");

        manager.remove_credential("client-1", "pw1").unwrap();
        assert!(manager.list_certificates("pw1").unwrap().is_empty());
        assert!(manager.remove_credential("client-1", "pw1").is_err());
    }

    #[test]
    fn test_check_password() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        assert!(manager.check_password("anything").unwrap());

        let pki = TestPki::new();
        import_default(&manager, &pki, "client-1");
        assert!(manager.check_password("pw1").unwrap());
        assert!(!manager.check_password("pw2").unwrap());
    }

    #[test]
    fn test_wrong_password_surfaces_on_list() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        import_default(&manager, &pki, "client-1");

        assert!(matches!(
            manager.list_certificates("pw2"),
            Err(CredentialError::Container(ContainerError::WrongPasswordOrCorrupt))
        ));
    }

    #[test]
    fn test_unsupported_algorithm_is_an_error() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let certificate = ecdsa_leaf().certificate();

        assert!(matches!(
            manager.verify(&certificate, b"data", &[0u8; 64]),
            Err(CredentialError::Provider(ProviderError::UnsupportedAlgorithm(_)))
        ));
    }

    #[test]
    fn test_verify_document_reports_certificate_policy() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        let certificate = import_default(&manager, &pki, "client-1");
        let signature = manager.sign("client-1", "pw1", b"hello world").unwrap();

        let outcome = manager
            .verify_document(&certificate, b"hello world", &signature)
            .unwrap();
        assert!(outcome.is_valid());
        assert!(outcome.certificate_acceptable());

        let tampered = manager
            .verify_document(&certificate, b"hello worlD", &signature)
            .unwrap();
        assert!(!tampered.is_valid());
        assert!(tampered.report.is_none());
    }

    #[test]
    fn test_validate_without_ca() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let pki = TestPki::new();
        let leaf = pki.leaf(CertSpec::default());

        let report = manager.validate(leaf.cert_pem.as_bytes(), None).unwrap();
        assert!(report.acceptable_for_signing());
        assert!(!report.ca_signature_checked);
    }
}
