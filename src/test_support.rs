//! Certificate fixtures for unit tests, generated with rcgen.

use rcgen::{
    date_time_ymd, BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    KeyUsagePurpose, PKCS_ECDSA_P256_SHA256, PKCS_ED25519,
};

use crate::domain::{pem_object, Certificate};

pub struct CertSpec {
    pub common_name: &'static str,
    pub not_before: (i32, u8, u8),
    pub not_after: (i32, u8, u8),
    pub key_usages: Vec<KeyUsagePurpose>,
    pub is_ca: bool,
    /// Leaves out basicConstraints entirely instead of writing `cA = false`.
    pub omit_basic_constraints: bool,
}

impl Default for CertSpec {
    fn default() -> Self {
        Self {
            common_name: "Test Signer",
            not_before: (2020, 1, 1),
            not_after: (2099, 12, 31),
            key_usages: vec![KeyUsagePurpose::DigitalSignature],
            is_ca: false,
            omit_basic_constraints: false,
        }
    }
}

pub struct TestLeaf {
    pub cert_pem: String,
    pub key_pem: String,
}

impl TestLeaf {
    pub fn certificate(&self) -> Certificate {
        pem_object::parse_certificate(self.cert_pem.as_bytes()).unwrap()
    }
}

pub struct TestPki {
    ca_key: KeyPair,
    ca_cert: rcgen::Certificate,
}

impl TestPki {
    pub fn new() -> Self {
        Self::with_name("Test Root CA")
    }

    pub fn with_name(common_name: &str) -> Self {
        let ca_key = KeyPair::generate_for(&PKCS_ED25519).unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.distinguished_name = distinguished_name(common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::DigitalSignature];
        params.not_before = date_time_ymd(2020, 1, 1);
        params.not_after = date_time_ymd(2099, 12, 31);
        let ca_cert = params.self_signed(&ca_key).unwrap();
        Self { ca_key, ca_cert }
    }

    pub fn ca_pem(&self) -> String {
        self.ca_cert.pem()
    }

    pub fn ca_certificate(&self) -> Certificate {
        Certificate::from_der(self.ca_cert.der().to_vec()).unwrap()
    }

    pub fn leaf(&self, spec: CertSpec) -> TestLeaf {
        let key = KeyPair::generate_for(&PKCS_ED25519).unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.distinguished_name = distinguished_name(spec.common_name);
        params.key_usages = spec.key_usages;
        params.is_ca = if spec.is_ca {
            IsCa::Ca(BasicConstraints::Unconstrained)
        } else if spec.omit_basic_constraints {
            // rcgen only writes an extension block when something forces it
            params.use_authority_key_identifier_extension = true;
            IsCa::NoCa
        } else {
            IsCa::ExplicitNoCa
        };
        let (y, m, d) = spec.not_before;
        params.not_before = date_time_ymd(y, m, d);
        let (y, m, d) = spec.not_after;
        params.not_after = date_time_ymd(y, m, d);

        let cert = params.signed_by(&key, &self.ca_cert, &self.ca_key).unwrap();
        TestLeaf {
            cert_pem: cert.pem(),
            key_pem: key.serialize_pem(),
        }
    }
}

/// Self-signed P-256 certificate, for algorithms no backend handles.
pub fn ecdsa_leaf() -> TestLeaf {
    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name = distinguished_name("ECDSA Signer");
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params.is_ca = IsCa::ExplicitNoCa;
    params.not_before = date_time_ymd(2020, 1, 1);
    params.not_after = date_time_ymd(2099, 12, 31);
    let cert = params.self_signed(&key).unwrap();
    TestLeaf {
        cert_pem: cert.pem(),
        key_pem: key.serialize_pem(),
    }
}

macro_rules! testdata {
    ($file:literal) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/", $file))
    };
}

/// ML-DSA-44 PKI issued with OpenSSL 3.5. The leaf key is kept in the three
/// PKCS#8 encodings OpenSSL can export.
pub mod mldsa44 {
    pub const CA_PEM: &str = testdata!("mldsa44_ca.pem");
    pub const LEAF_PEM: &str = testdata!("mldsa44_leaf.pem");
    /// `SEQUENCE { seed, expandedKey }`, OpenSSL's default output.
    pub const LEAF_KEY_BOTH_PEM: &str = testdata!("mldsa44_leaf_key_both.pem");
    pub const LEAF_KEY_EXPANDED_PEM: &str = testdata!("mldsa44_leaf_key_expanded.pem");
    pub const LEAF_KEY_SEED_PEM: &str = testdata!("mldsa44_leaf_key_seed.pem");
}

pub const ED25519_PKCS8_V1_PEM: &str = testdata!("ed25519_pkcs8_v1.pem");
/// OneAsymmetricKey with the public key attached.
pub const ED25519_PKCS8_V2_PEM: &str = testdata!("ed25519_pkcs8_v2.pem");

fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    dn.push(DnType::OrganizationName, "PQC Certstore Tests");
    dn
}
