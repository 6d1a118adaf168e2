use super::certificate::Certificate;
use super::policy::ValidationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStage {
    NoInputs,
    CertSelected,
    CertAndOneOfDocOrSig,
    AllThreeSelected,
    Verified { valid: bool },
}

/// Result of a completed verification: the cryptographic check plus the
/// signer certificate's policy report.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub signature_valid: bool,
    pub report: Option<ValidationReport>,
}

impl VerifyOutcome {
    pub fn is_valid(&self) -> bool {
        self.signature_valid
    }

    pub fn certificate_acceptable(&self) -> bool {
        self.report
            .as_ref()
            .map(ValidationReport::acceptable_for_signing)
            .unwrap_or(false)
    }
}

/// Tracks the three inputs of a document verification. Changing any input
/// after a verification drops the previous outcome.
#[derive(Debug, Default)]
pub struct VerificationFlow {
    certificate: Option<Certificate>,
    document: Option<Vec<u8>>,
    signature: Option<Vec<u8>>,
    outcome: Option<VerifyOutcome>,
}

impl VerificationFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> VerifyStage {
        if let Some(outcome) = &self.outcome {
            return VerifyStage::Verified {
                valid: outcome.is_valid(),
            };
        }

        let others = usize::from(self.document.is_some()) + usize::from(self.signature.is_some());
        match (self.certificate.is_some(), others) {
            (false, _) => VerifyStage::NoInputs,
            (true, 0) => VerifyStage::CertSelected,
            (true, 1) => VerifyStage::CertAndOneOfDocOrSig,
            (true, _) => VerifyStage::AllThreeSelected,
        }
    }

    pub fn select_certificate(&mut self, certificate: Certificate) {
        self.outcome = None;
        self.certificate = Some(certificate);
    }

    pub fn select_document(&mut self, document: Vec<u8>) {
        self.outcome = None;
        self.document = Some(document);
    }

    pub fn select_signature(&mut self, signature: Vec<u8>) {
        self.outcome = None;
        self.signature = Some(signature);
    }

    pub fn can_verify(&self) -> bool {
        self.stage() == VerifyStage::AllThreeSelected
    }

    /// Runs `check` over (certificate, document, signature) once all three
    /// are present. Returns `Ok(None)` when inputs are missing.
    pub fn verify<E, F>(&mut self, check: F) -> Result<Option<&VerifyOutcome>, E>
    where
        F: FnOnce(&Certificate, &[u8], &[u8]) -> Result<VerifyOutcome, E>,
    {
        let (Some(certificate), Some(document), Some(signature)) =
            (&self.certificate, &self.document, &self.signature)
        else {
            return Ok(None);
        };

        let outcome = check(certificate, document, signature)?;
        self.outcome = Some(outcome);
        Ok(self.outcome.as_ref())
    }

    pub fn outcome(&self) -> Option<&VerifyOutcome> {
        self.outcome.as_ref()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CertSpec, TestPki};

    fn outcome(valid: bool) -> VerifyOutcome {
        VerifyOutcome {
            signature_valid: valid,
            report: None,
        }
    }

    #[test]
    fn test_stages_follow_inputs() {
        let pki = TestPki::new();
        let mut flow = VerificationFlow::new();
        assert_eq!(flow.stage(), VerifyStage::NoInputs);

        flow.select_document(b"doc".to_vec());
        assert_eq!(flow.stage(), VerifyStage::NoInputs);

        flow.select_certificate(pki.leaf(CertSpec::default()).certificate());
        assert_eq!(flow.stage(), VerifyStage::CertAndOneOfDocOrSig);

        flow.select_signature(b"sig".to_vec());
        assert_eq!(flow.stage(), VerifyStage::AllThreeSelected);
        assert!(flow.can_verify());
    }

    #[test]
    fn test_verify_requires_all_inputs() {
        let mut flow = VerificationFlow::new();
        flow.select_document(b"doc".to_vec());

        let result: Result<_, ()> = flow.verify(|_, _, _| Ok(outcome(true)));
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_input_change_discards_outcome() {
        let pki = TestPki::new();
        let mut flow = VerificationFlow::new();
        flow.select_certificate(pki.leaf(CertSpec::default()).certificate());
        flow.select_document(b"doc".to_vec());
        flow.select_signature(b"sig".to_vec());

        let result: Result<_, ()> = flow.verify(|_, _, _| Ok(outcome(false)));
        assert!(result.unwrap().is_some());
        assert_eq!(flow.stage(), VerifyStage::Verified { valid: false });

        flow.select_signature(b"other".to_vec());
        assert_eq!(flow.stage(), VerifyStage::AllThreeSelected);
        assert!(flow.outcome().is_none());

        flow.reset();
        assert_eq!(flow.stage(), VerifyStage::NoInputs);
    }

    #[test]
    fn test_failed_check_keeps_pre_verification_stage() {
        let pki = TestPki::new();
        let mut flow = VerificationFlow::new();
        flow.select_certificate(pki.leaf(CertSpec::default()).certificate());
        flow.select_document(b"doc".to_vec());
        flow.select_signature(b"sig".to_vec());

        let result = flow.verify(|_, _, _| Err("unsupported algorithm"));
        assert!(result.is_err());
        assert_eq!(flow.stage(), VerifyStage::AllThreeSelected);
    }
}
